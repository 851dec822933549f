use std::collections::HashSet;

use super::models::{Plan, PlanId};
use super::{CatalogError, CatalogResult};

/// Static catalog of enrollment plans, fixed at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanRegistry {
    plans: Vec<Plan>,
}

impl PlanRegistry {
    /// Builds the registry, rejecting blank or duplicate identifiers and
    /// zero capacities. Listing order is the order given.
    pub fn new(plans: Vec<Plan>) -> CatalogResult<Self> {
        let mut seen = HashSet::new();
        for plan in &plans {
            if plan.id.is_blank() {
                return Err(CatalogError::BlankId);
            }
            if plan.capacity == 0 {
                return Err(CatalogError::ZeroCapacity {
                    plan_id: plan.id.to_string(),
                });
            }
            if !seen.insert(plan.id.clone()) {
                return Err(CatalogError::DuplicatePlan {
                    plan_id: plan.id.to_string(),
                });
            }
        }
        Ok(Self { plans })
    }

    pub fn list_plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn find_plan(&self, id: &PlanId) -> Option<&Plan> {
        self.plans.iter().find(|plan| &plan.id == id)
    }

    pub fn contains(&self, id: &PlanId) -> bool {
        self.find_plan(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
