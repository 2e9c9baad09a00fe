use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Roles ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Superadmin,
    Admin,
    EirsAdmin,
    EirsAgent,
    LgaAdmin,
    LgaAgent,
    LgaCAgent,
    VehicleOwner,
    PosAgent,
    AgencyAdmin,
    OdirsAdmin,
}

impl Role {
    pub const ALL: [Role; 11] = [
        Role::Superadmin,
        Role::Admin,
        Role::EirsAdmin,
        Role::EirsAgent,
        Role::LgaAdmin,
        Role::LgaAgent,
        Role::LgaCAgent,
        Role::VehicleOwner,
        Role::PosAgent,
        Role::AgencyAdmin,
        Role::OdirsAdmin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Superadmin => "SUPERADMIN",
            Role::Admin => "ADMIN",
            Role::EirsAdmin => "EIRS_ADMIN",
            Role::EirsAgent => "EIRS_AGENT",
            Role::LgaAdmin => "LGA_ADMIN",
            Role::LgaAgent => "LGA_AGENT",
            Role::LgaCAgent => "LGA_C_AGENT",
            Role::VehicleOwner => "VEHICLE_OWNER",
            Role::PosAgent => "POS_AGENT",
            Role::AgencyAdmin => "AGENCY_ADMIN",
            Role::OdirsAdmin => "ODIRS_ADMIN",
        }
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Capability table. Adding a role or a capability forces this match to
    /// be revisited.
    pub fn can(self, cap: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Superadmin | Role::Admin => true,
            Role::EirsAdmin => !matches!(cap, ManageWhitelist),
            Role::EirsAgent => matches!(
                cap,
                ViewDashboard
                    | ViewVehicles
                    | ManageVehicles
                    | AttachSticker
                    | RequestSticker
                    | CreateVirtualAccount
                    | ViewTransactions
                    | VerifyIdentity
            ),
            Role::LgaAdmin => matches!(
                cap,
                ViewDashboard
                    | ManageUsers
                    | ViewVehicles
                    | ManageVehicles
                    | RequestSticker
                    | ApproveSticker
                    | ViewTransactions
                    | VerifyIdentity
            ),
            Role::LgaAgent => matches!(
                cap,
                ViewDashboard
                    | ViewVehicles
                    | ManageVehicles
                    | RequestSticker
                    | CreateVirtualAccount
                    | ViewTransactions
                    | VerifyIdentity
            ),
            Role::LgaCAgent | Role::PosAgent => matches!(
                cap,
                ViewDashboard | ViewVehicles | ViewTransactions | ManageTransactions
            ),
            Role::VehicleOwner => matches!(
                cap,
                ViewDashboard | ViewVehicles | RequestSticker | ViewTransactions
            ),
            Role::AgencyAdmin => matches!(
                cap,
                ViewDashboard
                    | ManageUsers
                    | ViewVehicles
                    | ViewTransactions
                    | ViewPaymentNotifications
            ),
            Role::OdirsAdmin => matches!(
                cap,
                ViewDashboard | ViewVehicles | ViewTransactions | ViewPaymentNotifications
            ),
        }
    }

    /// Which roles a holder of `self` may hand out to other users.
    pub fn can_assign(self, target: Role) -> bool {
        match self {
            Role::Superadmin => true,
            Role::Admin => target != Role::Superadmin,
            Role::EirsAdmin => matches!(
                target,
                Role::EirsAgent | Role::PosAgent | Role::VehicleOwner
            ),
            Role::LgaAdmin => matches!(
                target,
                Role::LgaAgent | Role::LgaCAgent | Role::VehicleOwner
            ),
            Role::AgencyAdmin => target == Role::PosAgent,
            Role::EirsAgent
            | Role::LgaAgent
            | Role::LgaCAgent
            | Role::VehicleOwner
            | Role::PosAgent
            | Role::OdirsAdmin => false,
        }
    }

    pub fn capabilities(self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.can(*c))
            .collect()
    }

    pub fn assignable_roles(self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|r| self.can_assign(*r))
            .collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_owned()))
    }
}

// ── Capabilities ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewDashboard,
    ManageUsers,
    ViewVehicles,
    ManageVehicles,
    AttachSticker,
    RequestSticker,
    ApproveSticker,
    ManageStickers,
    CreateVirtualAccount,
    ViewTransactions,
    ManageTransactions,
    ViewPaymentNotifications,
    ManageWhitelist,
    ManageVehicleSettings,
    VerifyIdentity,
}

impl Capability {
    pub const ALL: [Capability; 15] = [
        Capability::ViewDashboard,
        Capability::ManageUsers,
        Capability::ViewVehicles,
        Capability::ManageVehicles,
        Capability::AttachSticker,
        Capability::RequestSticker,
        Capability::ApproveSticker,
        Capability::ManageStickers,
        Capability::CreateVirtualAccount,
        Capability::ViewTransactions,
        Capability::ManageTransactions,
        Capability::ViewPaymentNotifications,
        Capability::ManageWhitelist,
        Capability::ManageVehicleSettings,
        Capability::VerifyIdentity,
    ];
}

// ── RoleSet ──────────────────────────────────────────────────────────────────

/// A set of roles backed by a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet(u16);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);

    pub fn of(roles: &[Role]) -> Self {
        roles.iter().fold(Self::EMPTY, |set, r| set.with(*r))
    }

    pub fn with_capability(cap: Capability) -> Self {
        Role::ALL
            .into_iter()
            .filter(|r| r.can(cap))
            .fold(Self::EMPTY, |set, r| set.with(r))
    }

    pub const fn with(self, role: Role) -> Self {
        RoleSet(self.0 | role.bit())
    }

    pub const fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_strings() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("lga_c_agent".parse::<Role>().is_ok());
        assert!("TREASURER".parse::<Role>().is_err());
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let v = serde_json::to_value(Role::LgaCAgent).unwrap();
        assert_eq!(v, "LGA_C_AGENT");
        let r: Role = serde_json::from_value(serde_json::json!("ODIRS_ADMIN")).unwrap();
        assert_eq!(r, Role::OdirsAdmin);
    }

    #[test]
    fn whitelist_is_admin_only() {
        let set = RoleSet::with_capability(Capability::ManageWhitelist);
        let holders: Vec<Role> = set.iter().collect();
        assert_eq!(holders, vec![Role::Superadmin, Role::Admin]);
    }

    #[test]
    fn approvers_can_also_request() {
        for role in Role::ALL {
            if role.can(Capability::ApproveSticker) {
                assert!(role.can(Capability::RequestSticker), "{role}");
            }
        }
    }

    #[test]
    fn vehicle_owner_capabilities() {
        assert_eq!(
            Role::VehicleOwner.capabilities(),
            vec![
                Capability::ViewDashboard,
                Capability::ViewVehicles,
                Capability::RequestSticker,
                Capability::ViewTransactions,
            ]
        );
    }

    #[test]
    fn every_role_can_view_dashboard() {
        for role in Role::ALL {
            assert!(role.can(Capability::ViewDashboard), "{role}");
        }
    }

    #[test]
    fn admin_cannot_mint_superadmins() {
        assert!(Role::Superadmin.can_assign(Role::Superadmin));
        assert!(!Role::Admin.can_assign(Role::Superadmin));
        assert!(Role::Admin.can_assign(Role::OdirsAdmin));
    }

    #[test]
    fn lga_admin_assigns_only_lga_staff_and_owners() {
        assert_eq!(
            Role::LgaAdmin.assignable_roles(),
            vec![Role::LgaAgent, Role::LgaCAgent, Role::VehicleOwner]
        );
        assert!(Role::VehicleOwner.assignable_roles().is_empty());
    }

    #[test]
    fn role_set_membership() {
        let set = RoleSet::of(&[Role::PosAgent, Role::AgencyAdmin]);
        assert!(set.contains(Role::PosAgent));
        assert!(!set.contains(Role::Admin));
        assert!(RoleSet::EMPTY.is_empty());
    }
}
