//! Fixed plan catalogue and the plan -> instance type table.

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub cpu: i32,
    /// Memory in MB
    pub ram: i32,
    /// Disk in GB
    pub storage: i32,
    pub bandwidth: &'static str,
    pub monthly_cost: &'static str,
    pub price_per_hour: &'static str,
    /// Provider resource class launched for this plan
    pub instance_type: &'static str,
}

pub static PLANS: [Plan; 2] = [
    Plan {
        id: "starter",
        name: "Starter",
        description: "Ideal for personal blogs and small websites",
        cpu: 1,
        ram: 1024,
        storage: 10,
        bandwidth: "10 GB",
        monthly_cost: "$0",
        price_per_hour: "$0",
        instance_type: "t2.micro",
    },
    Plan {
        id: "pro",
        name: "Pro",
        description: "Perfect for growing businesses and applications",
        cpu: 2,
        ram: 4096,
        storage: 50,
        bandwidth: "100 GB",
        monthly_cost: "$29",
        price_per_hour: "$0.04",
        instance_type: "t3.medium",
    },
];

pub fn find_plan(id: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|plan| plan.id == id)
}

/// Resolve a plan to a plan record, or fail validation
pub fn require_plan(id: &str) -> AppResult<&'static Plan> {
    find_plan(id).ok_or_else(|| AppError::Validation(format!("Unsupported plan: {}", id)))
}

pub fn instance_type_for(plan: &str) -> AppResult<&'static str> {
    require_plan(plan).map(|plan| plan.instance_type)
}
