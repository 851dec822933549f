mod notice;

pub use notice::{Notice, NoticeLevel, Notifier};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::catalog::Plan;
use crate::enrollment::{
    create_student, edit_student, EnrollmentForm, EnrollmentWorkflow, WorkflowState,
};
use crate::roster::{
    NewStudent, PlanFilter, RosterError, RosterQuery, RosterResult, RosterStats, RosterStore,
    SelectionTracker, StatusFilter, Student, StudentId, StudentPatch, StudentStatus,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RosterSnapshot {
    pub revision: u64,
    pub query: RosterQuery,
    pub visible: Vec<Student>,
    pub selected: Vec<StudentId>,
    pub all_selected: bool,
}

/// Boundary between a presentation layer and the roster core.
///
/// Owns the store, the active filters, the selection and the enrollment
/// form. The selection is re-scoped to the visible set after every roster
/// mutation and filter change.
pub struct RosterEngine {
    store: RosterStore,
    query: RosterQuery,
    selection: SelectionTracker,
    workflow: EnrollmentWorkflow,
    revision: u64,
    fixed_date: Option<NaiveDate>,
    notifier: Option<Box<dyn Notifier>>,
}

impl std::fmt::Debug for RosterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterEngine")
            .field("store", &self.store)
            .field("query", &self.query)
            .field("selection", &self.selection)
            .field("workflow", &self.workflow)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl RosterEngine {
    pub fn new(store: RosterStore) -> Self {
        Self {
            store,
            query: RosterQuery::default(),
            selection: SelectionTracker::new(),
            workflow: EnrollmentWorkflow::new(),
            revision: 0,
            fixed_date: None,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_fixed_date(mut self, date: NaiveDate) -> Self {
        self.fixed_date = Some(date);
        self
    }

    pub fn store(&self) -> &RosterStore {
        &self.store
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn list_plans(&self) -> &[Plan] {
        self.store.registry().list_plans()
    }

    pub fn stats(&self) -> RosterStats {
        self.store.stats()
    }

    pub fn add_student(&mut self, input: NewStudent) -> RosterResult<Student> {
        let today = self.today();
        let result = create_student(&mut self.store, &EnrollmentForm::from_new_student(input), today);
        self.finish(result, |student| format!("{} enrolled", student.full_name()))
    }

    pub fn update_student(&mut self, id: StudentId, patch: StudentPatch) -> RosterResult<Student> {
        let result = match self.store.get(id) {
            Some(current) => {
                let mut form = EnrollmentForm::from_student(current);
                form.apply_patch(patch);
                edit_student(&mut self.store, id, &form)
            }
            None => Err(RosterError::NotFound { student_id: id }),
        };
        self.finish(result, |student| format!("{} updated", student.full_name()))
    }

    pub fn set_student_status(
        &mut self,
        id: StudentId,
        status: StudentStatus,
    ) -> RosterResult<Student> {
        let result = self.store.set_status(id, status);
        self.finish(result, |student| {
            format!("{} is now {}", student.full_name(), student.status)
        })
    }

    pub fn set_student_progress(&mut self, id: StudentId, progress: u32) -> RosterResult<Student> {
        let result = self.store.set_progress(id, progress);
        self.finish(result, |student| {
            format!("{} progress at {}%", student.full_name(), student.progress)
        })
    }

    /// Deleting an absent identifier is a silent no-op.
    pub fn delete_student(&mut self, id: StudentId) -> Option<Student> {
        let removed = self.store.remove(id)?;
        self.selection.purge([id].iter());
        self.close_form_for(&[id]);
        self.committed();
        self.emit(Notice::success(format!("{} removed", removed.full_name())));
        Some(removed)
    }

    pub fn delete_students<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a StudentId>,
    {
        let ids: Vec<StudentId> = ids.into_iter().copied().collect();
        let removed = self.store.remove_many(&ids);
        self.selection.purge(&ids);
        self.close_form_for(&ids);
        if removed > 0 {
            self.committed();
            self.emit(Notice::success(format!("{removed} students removed")));
        }
        removed
    }

    pub fn delete_selected(&mut self) -> usize {
        let selected: Vec<StudentId> = self.selection.ids().collect();
        self.delete_students(&selected)
    }

    pub fn query(&self) -> &RosterQuery {
        &self.query
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.query.search = text.into();
        self.filter_changed();
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) {
        self.query.status = filter;
        self.filter_changed();
    }

    pub fn set_plan_filter(&mut self, filter: PlanFilter) {
        self.query.plan = filter;
        self.filter_changed();
    }

    pub fn visible(&self) -> Vec<&Student> {
        self.query.apply(self.store.list_all())
    }

    pub fn visible_ids(&self) -> Vec<StudentId> {
        self.visible().iter().map(|student| student.id).collect()
    }

    pub fn select_all(&mut self, selected: bool) {
        if selected {
            let visible = self.visible_ids();
            self.selection.select_all(visible);
        } else {
            self.selection.deselect_all();
        }
    }

    /// Identifiers outside the visible set are ignored.
    pub fn toggle_select(&mut self, id: StudentId, included: bool) {
        if included && !self.visible_ids().contains(&id) {
            debug!(target: "roster.engine", student_id = %id, "ignoring selection of hidden student");
            return;
        }
        self.selection.toggle(id, included);
    }

    pub fn selected_ids(&self) -> Vec<StudentId> {
        self.selection.ids().collect()
    }

    pub fn all_selected(&self) -> bool {
        self.selection.all_selected(self.visible_ids())
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        let visible: Vec<Student> = self.visible().into_iter().cloned().collect();
        let all_selected = self
            .selection
            .all_selected(visible.iter().map(|student| student.id));
        RosterSnapshot {
            revision: self.revision,
            query: self.query.clone(),
            visible,
            selected: self.selected_ids(),
            all_selected,
        }
    }

    pub fn workflow_state(&self) -> WorkflowState {
        self.workflow.state()
    }

    pub fn form(&self) -> &EnrollmentForm {
        self.workflow.form()
    }

    pub fn form_mut(&mut self) -> RosterResult<&mut EnrollmentForm> {
        self.workflow.form_mut()
    }

    pub fn begin_create(&mut self) -> RosterResult<()> {
        self.workflow.begin_create()
    }

    pub fn begin_edit(&mut self, id: StudentId) -> RosterResult<()> {
        self.workflow.begin_edit(&self.store, id)
    }

    pub fn cancel_form(&mut self) {
        self.workflow.cancel();
    }

    pub fn submit_form(&mut self) -> RosterResult<Student> {
        let today = self.today();
        let result = self.workflow.submit_on(&mut self.store, today);
        self.finish(result, |student| format!("{} saved", student.full_name()))
    }

    fn today(&self) -> NaiveDate {
        self.fixed_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn finish<F>(&mut self, result: RosterResult<Student>, describe: F) -> RosterResult<Student>
    where
        F: FnOnce(&Student) -> String,
    {
        match &result {
            Ok(student) => {
                self.committed();
                self.emit(Notice::success(describe(student)));
            }
            Err(err) => self.emit(Notice::failure(err.to_string())),
        }
        result
    }

    fn committed(&mut self) {
        self.revision += 1;
        self.rescope_selection();
    }

    fn filter_changed(&mut self) {
        debug!(target: "roster.engine", query = ?self.query, "filter changed");
        self.rescope_selection();
    }

    fn rescope_selection(&mut self) {
        let visible = self.visible_ids();
        self.selection.retain_visible(visible);
    }

    fn close_form_for(&mut self, removed: &[StudentId]) {
        if let WorkflowState::Editing(id) = self.workflow.state() {
            if removed.contains(&id) && !self.store.contains(id) {
                self.workflow.cancel();
            }
        }
    }

    fn emit(&self, notice: Notice) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(&notice);
        }
    }
}
