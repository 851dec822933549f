use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::PlanId;

use super::models::{Student, StudentStatus};
use super::RosterError;

const ALL: &str = "all";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Only(StudentStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: StudentStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(expected) => *expected == status,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str(ALL),
            StatusFilter::Only(status) => write!(f, "{status}"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(ALL) {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanFilter {
    #[default]
    All,
    Only(PlanId),
}

impl PlanFilter {
    pub fn matches(&self, plan_id: &PlanId) -> bool {
        match self {
            PlanFilter::All => true,
            PlanFilter::Only(expected) => expected == plan_id,
        }
    }
}

impl fmt::Display for PlanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanFilter::All => f.write_str(ALL),
            PlanFilter::Only(plan_id) => write!(f, "{plan_id}"),
        }
    }
}

impl FromStr for PlanFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(ALL) {
            Ok(PlanFilter::All)
        } else {
            Ok(PlanFilter::Only(PlanId::new(s)))
        }
    }
}

/// Search text plus status and plan filters, ANDed together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterQuery {
    pub search: String,
    pub status: StatusFilter,
    pub plan: PlanFilter,
}

impl RosterQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn status(mut self, filter: StatusFilter) -> Self {
        self.status = filter;
        self
    }

    pub fn plan(mut self, filter: PlanFilter) -> Self {
        self.plan = filter;
        self
    }

    /// Case-insensitive substring match on first name, last name or email.
    /// Only the empty string matches everything.
    pub fn matches_search(&self, student: &Student) -> bool {
        let needle = self.search.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&student.first_name, &student.last_name, &student.email]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    pub fn matches_status(&self, student: &Student) -> bool {
        self.status.matches(student.status)
    }

    pub fn matches_plan(&self, student: &Student) -> bool {
        self.plan.matches(&student.plan_id)
    }

    pub fn matches(&self, student: &Student) -> bool {
        self.matches_search(student) && self.matches_status(student) && self.matches_plan(student)
    }

    /// Filters `students` preserving their order.
    pub fn apply<'a>(&self, students: &'a [Student]) -> Vec<&'a Student> {
        students
            .iter()
            .filter(|student| self.matches(student))
            .collect()
    }
}
