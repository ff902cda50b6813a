use serde::{Deserialize, Serialize};
use std::fmt;

/// Staff roles as they appear in token claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Director")]
    Director,
    #[serde(rename = "Super Admin")]
    SuperAdmin,
    #[serde(rename = "Technician Manager")]
    TechnicianManager,
    #[serde(rename = "Sales Manager")]
    SalesManager,
    #[serde(rename = "Inventory Manager")]
    InventoryManager,
    #[serde(rename = "Sales Member")]
    SalesMember,
    #[serde(rename = "Technician")]
    Technician,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Director,
        Role::SuperAdmin,
        Role::TechnicianManager,
        Role::SalesManager,
        Role::InventoryManager,
        Role::SalesMember,
        Role::Technician,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Director => "Director",
            Role::SuperAdmin => "Super Admin",
            Role::TechnicianManager => "Technician Manager",
            Role::SalesManager => "Sales Manager",
            Role::InventoryManager => "Inventory Manager",
            Role::SalesMember => "Sales Member",
            Role::Technician => "Technician",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("super admin"), None);
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&Role::InventoryManager).unwrap();
        assert_eq!(json, "\"Inventory Manager\"");
    }
}
