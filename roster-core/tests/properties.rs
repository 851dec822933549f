//! Property tests over random operation sequences against the roster engine.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;

use roster_core::{
    NewStudent, Plan, PlanFilter, PlanId, PlanRegistry, RosterEngine, RosterQuery, RosterStore,
    StatusFilter, Student, StudentId, StudentPatch, StudentStatus,
};

const PLANS: [(&str, u32); 3] = [("basic", 2), ("standard", 4), ("premium", 1)];
const FIRST_NAMES: [&str; 4] = ["Thabo", "Lerato", "Sipho", "Naledi"];
const LAST_NAMES: [&str; 4] = ["Nkosi", "Mokoena", "Dlamini", "Khumalo"];
const SEARCHES: [&str; 5] = ["", "nko", "LE", "o", "zzz"];

#[derive(Debug, Clone)]
enum Op {
    Add { first: usize, last: usize, plan: usize },
    Update { pick: usize, plan: usize },
    Delete { pick: usize },
    DeleteMany { picks: Vec<usize> },
    DeleteSelected,
    SetStatus { pick: usize, status: usize },
    Search { text: usize },
    FilterPlan { plan: Option<usize> },
    SelectAll(bool),
    Toggle { pick: usize, included: bool },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..4usize, 0..4usize, 0..3usize)
            .prop_map(|(first, last, plan)| Op::Add { first, last, plan }),
        2 => (0..8usize, 0..3usize).prop_map(|(pick, plan)| Op::Update { pick, plan }),
        1 => (0..8usize).prop_map(|pick| Op::Delete { pick }),
        1 => prop::collection::vec(0..8usize, 0..4).prop_map(|picks| Op::DeleteMany { picks }),
        1 => Just(Op::DeleteSelected),
        1 => (0..8usize, 0..3usize).prop_map(|(pick, status)| Op::SetStatus { pick, status }),
        1 => (0..SEARCHES.len()).prop_map(|text| Op::Search { text }),
        1 => prop::option::of(0..3usize).prop_map(|plan| Op::FilterPlan { plan }),
        1 => any::<bool>().prop_map(Op::SelectAll),
        2 => (0..8usize, any::<bool>()).prop_map(|(pick, included)| Op::Toggle { pick, included }),
    ]
}

fn engine() -> RosterEngine {
    let plans = PLANS
        .iter()
        .map(|(id, capacity)| Plan::new(*id, id.to_uppercase(), *capacity))
        .collect();
    let registry = PlanRegistry::new(plans).unwrap();
    RosterEngine::new(RosterStore::new(Arc::new(registry)))
        .with_fixed_date(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap())
}

/// Picks a live identifier, or a stale one when the roster is empty.
fn pick(engine: &RosterEngine, index: usize) -> StudentId {
    let all = engine.store().list_all();
    if all.is_empty() {
        StudentId::new(index as u64 + 1)
    } else {
        all[index % all.len()].id
    }
}

fn apply(engine: &mut RosterEngine, op: &Op) {
    match op {
        Op::Add { first, last, plan } => {
            let first = FIRST_NAMES[*first];
            let last = LAST_NAMES[*last];
            let email = format!("{}@example.co.za", first.to_lowercase());
            let _ = engine.add_student(NewStudent::new(first, last, email, PLANS[*plan].0));
        }
        Op::Update { pick: index, plan } => {
            let id = pick(engine, *index);
            let _ = engine.update_student(id, StudentPatch::new().plan(PLANS[*plan].0));
        }
        Op::Delete { pick: index } => {
            let id = pick(engine, *index);
            engine.delete_student(id);
        }
        Op::DeleteMany { picks } => {
            let view: &RosterEngine = engine;
            let ids: Vec<StudentId> = picks.iter().map(|index| pick(view, *index)).collect();
            engine.delete_students(&ids);
        }
        Op::DeleteSelected => {
            engine.delete_selected();
        }
        Op::SetStatus { pick: index, status } => {
            let id = pick(engine, *index);
            let _ = engine.set_student_status(id, StudentStatus::ALL[*status]);
        }
        Op::Search { text } => engine.set_search_text(SEARCHES[*text]),
        Op::FilterPlan { plan } => engine.set_plan_filter(match plan {
            Some(index) => PlanFilter::Only(PlanId::new(PLANS[*index].0)),
            None => PlanFilter::All,
        }),
        Op::SelectAll(value) => engine.select_all(*value),
        Op::Toggle { pick: index, included } => {
            let id = pick(engine, *index);
            engine.toggle_select(id, *included);
        }
    }
}

fn arb_student() -> impl Strategy<Value = (usize, usize, usize, usize)> {
    (0..4usize, 0..4usize, 0..3usize, 0..3usize)
}

fn build_roster(rows: &[(usize, usize, usize, usize)]) -> Vec<Student> {
    rows.iter()
        .enumerate()
        .map(|(idx, (first, last, plan, status))| Student {
            id: StudentId::new(idx as u64 + 1),
            first_name: FIRST_NAMES[*first].to_string(),
            last_name: LAST_NAMES[*last].to_string(),
            email: format!("{}.{}@example.co.za", FIRST_NAMES[*first], idx),
            plan_id: PlanId::new(PLANS[*plan].0),
            enrolled_on: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            status: StudentStatus::ALL[*status],
            progress: 0,
        })
        .collect()
}

proptest! {
    #[test]
    fn invariants_hold_across_operation_sequences(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut engine = engine();
        let mut ever_seen: HashSet<StudentId> = HashSet::new();

        for op in &ops {
            let before: HashSet<StudentId> =
                engine.store().list_all().iter().map(|student| student.id).collect();
            apply(&mut engine, op);

            let ids: Vec<StudentId> =
                engine.store().list_all().iter().map(|student| student.id).collect();
            let unique: HashSet<StudentId> = ids.iter().copied().collect();
            prop_assert_eq!(unique.len(), ids.len());

            for id in unique.difference(&before) {
                prop_assert!(ever_seen.insert(*id), "identifier {} reused", id);
            }
            ever_seen.extend(unique.iter().copied());

            for plan in engine.list_plans() {
                prop_assert!(engine.store().occupancy(&plan.id) <= plan.capacity as usize);
            }

            let visible: HashSet<StudentId> = engine.visible_ids().into_iter().collect();
            for id in engine.selected_ids() {
                prop_assert!(unique.contains(&id));
                prop_assert!(visible.contains(&id));
            }
        }
    }

    #[test]
    fn predicate_order_does_not_change_result(
        rows in prop::collection::vec(arb_student(), 0..20),
        search in 0..SEARCHES.len(),
        status in prop::option::of(0..3usize),
        plan in prop::option::of(0..3usize),
    ) {
        let roster = build_roster(&rows);
        let query = RosterQuery::new()
            .search(SEARCHES[search])
            .status(status.map_or(StatusFilter::All, |idx| StatusFilter::Only(StudentStatus::ALL[idx])))
            .plan(plan.map_or(PlanFilter::All, |idx| PlanFilter::Only(PlanId::new(PLANS[idx].0))));

        let expected: Vec<StudentId> = query.apply(&roster).iter().map(|student| student.id).collect();

        let predicates: [fn(&RosterQuery, &Student) -> bool; 3] = [
            RosterQuery::matches_search,
            RosterQuery::matches_status,
            RosterQuery::matches_plan,
        ];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let mut current: Vec<&Student> = roster.iter().collect();
            for index in order {
                current.retain(|student| predicates[index](&query, student));
            }
            let ids: Vec<StudentId> = current.iter().map(|student| student.id).collect();
            prop_assert_eq!(&ids, &expected);
        }
    }

    #[test]
    fn select_all_round_trip_is_empty(count in 0usize..30) {
        let mut engine = engine();
        for idx in 0..count {
            let _ = engine.add_student(NewStudent::new(
                FIRST_NAMES[idx % 4],
                LAST_NAMES[idx % 4],
                "student@example.co.za",
                PLANS[idx % 3].0,
            ));
        }
        engine.select_all(true);
        prop_assert_eq!(engine.selected_ids().len(), engine.visible_ids().len());
        engine.select_all(false);
        prop_assert!(engine.selected_ids().is_empty());
    }
}
