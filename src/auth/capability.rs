//! Capability checks for mutating operations.
//!
//! Every handler that writes asks `can_edit(principal, resource)`; there are
//! no per-endpoint role lists anywhere else.

use uuid::Uuid;

use super::{AuthUser, Role};
use crate::errors::ServiceError;

/// What a principal is trying to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Machines, parts and accessories
    InventoryItem,
    Store,
    Client,
    /// Sales and their lines
    Sale,
    /// Lease contracts, lease part/accessory inquiries and meter readings
    Lease,
    /// A store requisition, editable and issuable by whoever raised it
    StoreInquiry { requested_by: Uuid },
    /// Rejecting or reopening a requisition
    StoreInquiryDecision,
    Call,
    Delivery { assigned_to: Uuid },
}

/// Single authorization decision point.
pub fn can_edit(principal: &AuthUser, resource: Resource) -> bool {
    if principal.is_admin() {
        return true;
    }

    let role = principal.role;
    match resource {
        Resource::InventoryItem | Resource::Store => role == Role::InventoryManager,
        Resource::Client => matches!(
            role,
            Role::SalesManager | Role::SalesMember | Role::TechnicianManager
        ),
        Resource::Sale => matches!(role, Role::SalesManager | Role::SalesMember),
        Resource::Lease => matches!(
            role,
            Role::SalesManager | Role::InventoryManager | Role::TechnicianManager
        ),
        Resource::StoreInquiry { requested_by } => {
            requested_by == principal.user_id
                || matches!(role, Role::InventoryManager | Role::TechnicianManager)
        }
        Resource::StoreInquiryDecision => {
            matches!(role, Role::InventoryManager | Role::TechnicianManager)
        }
        Resource::Call => matches!(role, Role::TechnicianManager | Role::Technician),
        Resource::Delivery { assigned_to } => {
            assigned_to == principal.user_id
                || matches!(role, Role::SalesManager | Role::InventoryManager)
        }
    }
}

/// `can_edit` as a `Result`, for use with `?` in handlers.
pub fn require_edit(principal: &AuthUser, resource: Resource) -> Result<(), ServiceError> {
    if can_edit(principal, resource) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %principal.user_id,
            role = %principal.role,
            ?resource,
            "edit denied"
        );
        Err(ServiceError::Forbidden(format!(
            "{} may not modify this resource",
            principal.role
        )))
    }
}
