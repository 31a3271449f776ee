//! Subscription plans and the Pro gate
//!
//! Plans are a closed set. Labels outside the set are kept verbatim so a
//! stored record survives a round trip, but they never unlock anything.

use crate::user::User;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    ProMonthly,
    ProAnnual,
    Business,
    /// A label this client does not know about
    Unrecognized(String),
}

impl Plan {
    /// Every plan a user can be moved to
    pub const PAID: [Plan; 4] = [Plan::Pro, Plan::ProMonthly, Plan::ProAnnual, Plan::Business];

    /// Exact label match, no substring or case folding
    pub fn from_label(label: &str) -> Self {
        match label {
            "Free" => Plan::Free,
            "Pro" => Plan::Pro,
            "Pro Monthly" => Plan::ProMonthly,
            "Pro Annual" => Plan::ProAnnual,
            "Business" => Plan::Business,
            other => Plan::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Plan::Free => "Free",
            Plan::Pro => "Pro",
            Plan::ProMonthly => "Pro Monthly",
            Plan::ProAnnual => "Pro Annual",
            Plan::Business => "Business",
            Plan::Unrecognized(label) => label,
        }
    }

    pub fn is_pro(&self) -> bool {
        matches!(
            self,
            Plan::Pro | Plan::ProMonthly | Plan::ProAnnual | Plan::Business
        )
    }
}

impl From<String> for Plan {
    fn from(label: String) -> Self {
        Plan::from_label(&label)
    }
}

impl From<Plan> for String {
    fn from(plan: Plan) -> Self {
        plan.label().to_string()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// True iff a user is signed in on a paid plan
pub fn is_pro(user: Option<&User>) -> bool {
    user.map(|u| u.plan.is_pro()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels_round_trip() {
        for label in ["Free", "Pro", "Pro Monthly", "Pro Annual", "Business"] {
            assert_eq!(Plan::from_label(label).label(), label);
        }
    }

    #[test]
    fn test_paid_tiers_are_pro() {
        for plan in Plan::PAID {
            assert!(plan.is_pro(), "{} should be Pro", plan);
        }
        assert!(!Plan::Free.is_pro());
    }

    #[test]
    fn test_substring_does_not_unlock() {
        assert!(!Plan::from_label("Prototype").is_pro());
        assert!(!Plan::from_label("pro").is_pro());
        assert!(!Plan::from_label("Pro Trial").is_pro());
        assert_eq!(
            Plan::from_label("Pro Trial"),
            Plan::Unrecognized("Pro Trial".to_string())
        );
    }

    #[test]
    fn test_plan_serializes_as_label() {
        let json = serde_json::to_string(&Plan::ProAnnual).unwrap();
        assert_eq!(json, r#""Pro Annual""#);

        let plan: Plan = serde_json::from_str(r#""Enterprise""#).unwrap();
        assert_eq!(plan.label(), "Enterprise");
        assert!(!plan.is_pro());
    }

    #[test]
    fn test_is_pro_without_user() {
        assert!(!is_pro(None));
    }
}
