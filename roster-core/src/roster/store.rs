use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::catalog::{PlanId, PlanRegistry};

use super::models::{
    NewStudent, PlanOccupancy, RosterStats, Student, StudentId, StudentPatch, StudentStatus,
};
use super::{RosterError, RosterResult};

/// Single owner of every student record, kept in insertion order.
#[derive(Debug, Clone)]
pub struct RosterStore {
    registry: Arc<PlanRegistry>,
    students: Vec<Student>,
    next_id: u64,
}

impl RosterStore {
    pub fn new(registry: Arc<PlanRegistry>) -> Self {
        Self {
            registry,
            students: Vec::new(),
            next_id: 1,
        }
    }

    pub fn registry(&self) -> &PlanRegistry {
        &self.registry
    }

    pub fn list_all(&self) -> &[Student] {
        &self.students
    }

    pub fn get(&self, id: StudentId) -> Option<&Student> {
        self.students.iter().find(|student| student.id == id)
    }

    pub fn contains(&self, id: StudentId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Number of records assigned to `plan_id`. Every status counts; only
    /// deleted records free a slot.
    pub fn occupancy(&self, plan_id: &PlanId) -> usize {
        self.occupancy_excluding(plan_id, None)
    }

    fn occupancy_excluding(&self, plan_id: &PlanId, excluding: Option<StudentId>) -> usize {
        self.students
            .iter()
            .filter(|student| &student.plan_id == plan_id)
            .filter(|student| Some(student.id) != excluding)
            .count()
    }

    /// Capacity gate shared by the create and edit paths. `excluding` removes
    /// a student's own slot from the count when it is being reassigned.
    pub fn validate_capacity(
        &self,
        plan_id: &PlanId,
        excluding: Option<StudentId>,
    ) -> RosterResult<()> {
        let plan = self
            .registry
            .find_plan(plan_id)
            .ok_or_else(|| RosterError::UnknownPlan {
                plan_id: plan_id.clone(),
            })?;
        let occupancy = self.occupancy_excluding(plan_id, excluding);
        if occupancy >= plan.capacity as usize {
            warn!(
                target: "roster.store",
                plan_id = %plan_id,
                capacity = plan.capacity,
                occupancy,
                "capacity gate rejected assignment"
            );
            return Err(RosterError::CapacityExceeded {
                plan_id: plan_id.clone(),
                capacity: plan.capacity,
                occupancy,
            });
        }
        Ok(())
    }

    pub fn add(&mut self, input: NewStudent) -> RosterResult<Student> {
        self.add_on(input, Utc::now().date_naive())
    }

    pub fn add_on(&mut self, input: NewStudent, today: NaiveDate) -> RosterResult<Student> {
        self.validate_capacity(&input.plan_id, None)?;

        let id = StudentId::new(self.next_id);
        self.next_id += 1;
        let student = Student {
            id,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            plan_id: input.plan_id,
            enrolled_on: today,
            status: StudentStatus::Active,
            progress: 0,
        };
        info!(
            target: "roster.store",
            student_id = %student.id,
            plan_id = %student.plan_id,
            "student added"
        );
        self.students.push(student.clone());
        Ok(student)
    }

    pub fn update(&mut self, id: StudentId, patch: StudentPatch) -> RosterResult<Student> {
        let index = self.index_of(id)?;
        if let Some(plan_id) = &patch.plan_id {
            if plan_id != &self.students[index].plan_id {
                self.validate_capacity(plan_id, Some(id))?;
            }
        }

        let student = &mut self.students[index];
        if let Some(first_name) = patch.first_name {
            student.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            student.last_name = last_name;
        }
        if let Some(email) = patch.email {
            student.email = email;
        }
        if let Some(plan_id) = patch.plan_id {
            student.plan_id = plan_id;
        }
        info!(
            target: "roster.store",
            student_id = %student.id,
            plan_id = %student.plan_id,
            "student updated"
        );
        Ok(student.clone())
    }

    pub fn set_status(&mut self, id: StudentId, status: StudentStatus) -> RosterResult<Student> {
        let index = self.index_of(id)?;
        let student = &mut self.students[index];
        student.status = status;
        info!(target: "roster.store", student_id = %id, status = %status, "status changed");
        Ok(student.clone())
    }

    pub fn set_progress(&mut self, id: StudentId, progress: u32) -> RosterResult<Student> {
        let value = u8::try_from(progress)
            .ok()
            .filter(|value| *value <= 100)
            .ok_or(RosterError::InvalidProgress { value: progress })?;
        let index = self.index_of(id)?;
        let student = &mut self.students[index];
        student.progress = value;
        debug!(target: "roster.store", student_id = %id, progress = value, "progress changed");
        Ok(student.clone())
    }

    /// Idempotent: removing an absent identifier is a no-op returning `None`.
    pub fn remove(&mut self, id: StudentId) -> Option<Student> {
        let index = self.students.iter().position(|student| student.id == id)?;
        let removed = self.students.remove(index);
        info!(target: "roster.store", student_id = %id, "student removed");
        Some(removed)
    }

    pub fn remove_many<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a StudentId>,
    {
        let targets: HashSet<StudentId> = ids.into_iter().copied().collect();
        if targets.is_empty() {
            return 0;
        }
        let before = self.students.len();
        self.students
            .retain(|student| !targets.contains(&student.id));
        let removed = before - self.students.len();
        info!(
            target: "roster.store",
            requested = targets.len(),
            removed,
            "bulk removal"
        );
        removed
    }

    pub fn stats(&self) -> RosterStats {
        let mut by_status = BTreeMap::new();
        for status in StudentStatus::ALL {
            by_status.insert(status.as_str().to_string(), 0);
        }
        for student in &self.students {
            *by_status
                .entry(student.status.as_str().to_string())
                .or_insert(0) += 1;
        }

        let average_progress = if self.students.is_empty() {
            0.0
        } else {
            let sum: u64 = self
                .students
                .iter()
                .map(|student| u64::from(student.progress))
                .sum();
            sum as f64 / self.students.len() as f64
        };

        let plans = self
            .registry
            .list_plans()
            .iter()
            .map(|plan| {
                let occupancy = self.occupancy(&plan.id);
                PlanOccupancy {
                    plan_id: plan.id.clone(),
                    name: plan.name.clone(),
                    capacity: plan.capacity,
                    occupancy,
                    available: (plan.capacity as usize).saturating_sub(occupancy),
                }
            })
            .collect();

        RosterStats {
            total: self.students.len(),
            by_status,
            average_progress,
            plans,
        }
    }

    fn index_of(&self, id: StudentId) -> RosterResult<usize> {
        self.students
            .iter()
            .position(|student| student.id == id)
            .ok_or(RosterError::NotFound { student_id: id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Plan;

    fn store() -> RosterStore {
        let registry = PlanRegistry::new(vec![
            Plan::new("basic", "Basic", 2),
            Plan::new("premium", "Premium", 5),
        ])
        .unwrap();
        RosterStore::new(Arc::new(registry))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    #[test]
    fn add_assigns_defaults() {
        let mut store = store();
        let student = store
            .add_on(
                NewStudent::new("Thabo", "Nkosi", "thabo@example.com", "basic"),
                date(),
            )
            .unwrap();
        assert_eq!(student.id, StudentId::new(1));
        assert_eq!(student.status, StudentStatus::Active);
        assert_eq!(student.progress, 0);
        assert_eq!(student.enrolled_on, date());
        assert_eq!(store.list_all(), &[student]);
    }

    #[test]
    fn add_rejects_unknown_plan() {
        let mut store = store();
        let err = store
            .add_on(NewStudent::new("A", "B", "a@b.c", "gold"), date())
            .unwrap_err();
        assert_eq!(
            err,
            RosterError::UnknownPlan {
                plan_id: PlanId::new("gold")
            }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn identifiers_are_not_reused_after_removal() {
        let mut store = store();
        let first = store
            .add_on(NewStudent::new("A", "One", "a@x.io", "premium"), date())
            .unwrap();
        store.remove(first.id);
        let second = store
            .add_on(NewStudent::new("B", "Two", "b@x.io", "premium"), date())
            .unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn update_missing_student_is_not_found() {
        let mut store = store();
        let err = store
            .update(StudentId::new(99), StudentPatch::new().first_name("X"))
            .unwrap_err();
        assert_eq!(
            err,
            RosterError::NotFound {
                student_id: StudentId::new(99)
            }
        );
    }

    #[test]
    fn update_into_full_plan_leaves_record_untouched() {
        let mut store = store();
        for idx in 0..2 {
            store
                .add_on(
                    NewStudent::new("Full", format!("{idx}"), "f@x.io", "basic"),
                    date(),
                )
                .unwrap();
        }
        let mover = store
            .add_on(NewStudent::new("Mover", "M", "m@x.io", "premium"), date())
            .unwrap();

        let err = store
            .update(
                mover.id,
                StudentPatch::new().first_name("Changed").plan("basic"),
            )
            .unwrap_err();
        assert!(matches!(err, RosterError::CapacityExceeded { .. }));
        assert_eq!(store.get(mover.id), Some(&mover));
    }

    #[test]
    fn suspended_students_still_occupy_a_slot() {
        let mut store = store();
        let student = store
            .add_on(NewStudent::new("S", "S", "s@x.io", "basic"), date())
            .unwrap();
        store.set_status(student.id, StudentStatus::Suspended).unwrap();
        assert_eq!(store.occupancy(&PlanId::new("basic")), 1);
    }

    #[test]
    fn progress_is_bounded() {
        let mut store = store();
        let student = store
            .add_on(NewStudent::new("P", "P", "p@x.io", "basic"), date())
            .unwrap();
        assert_eq!(store.set_progress(student.id, 100).unwrap().progress, 100);
        assert_eq!(
            store.set_progress(student.id, 101),
            Err(RosterError::InvalidProgress { value: 101 })
        );
        assert_eq!(store.get(student.id).unwrap().progress, 100);
    }

    #[test]
    fn remove_many_counts_only_present_ids() {
        let mut store = store();
        let a = store
            .add_on(NewStudent::new("A", "A", "a@x.io", "premium"), date())
            .unwrap();
        let b = store
            .add_on(NewStudent::new("B", "B", "b@x.io", "premium"), date())
            .unwrap();
        let removed = store.remove_many(&[a.id, StudentId::new(42), a.id]);
        assert_eq!(removed, 1);
        assert_eq!(store.list_all().len(), 1);
        assert_eq!(store.list_all()[0].id, b.id);
    }

    #[test]
    fn stats_report_occupancy_per_plan() {
        let mut store = store();
        let a = store
            .add_on(NewStudent::new("A", "A", "a@x.io", "basic"), date())
            .unwrap();
        store
            .add_on(NewStudent::new("B", "B", "b@x.io", "premium"), date())
            .unwrap();
        store.set_progress(a.id, 50).unwrap();
        store.set_status(a.id, StudentStatus::Inactive).unwrap();

        let stats = store.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status["active"], 1);
        assert_eq!(stats.by_status["inactive"], 1);
        assert_eq!(stats.by_status["suspended"], 0);
        assert!((stats.average_progress - 25.0).abs() < f64::EPSILON);
        assert_eq!(stats.plans[0].occupancy, 1);
        assert_eq!(stats.plans[0].available, 1);
        assert_eq!(stats.plans[1].available, 4);
    }
}
