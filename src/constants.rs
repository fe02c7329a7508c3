//! Permission names and system limits

/// Reserved token meaning every permission, including ones added later
pub const WILDCARD: &str = "*";

// Permission names referenced by the built-in routes
pub const VIEW_USERS: &str = "view_users";
pub const EDIT_USERS: &str = "edit_users";
pub const DELETE_USERS: &str = "delete_users";
pub const EDIT_ROLES: &str = "edit_roles";
pub const DELETE_ROLES: &str = "delete_roles";
pub const VIEW_SYSTEMS: &str = "view_systems";
pub const EDIT_SYSTEMS: &str = "edit_systems";
pub const DELETE_SYSTEMS: &str = "delete_systems";
pub const VIEW_FAULTS: &str = "view_faults";
pub const EDIT_FAULTS: &str = "edit_faults";
pub const DELETE_FAULTS: &str = "delete_faults";
pub const ADMIN: &str = "admin";
pub const GRANT_PERMISSIONS: &str = "grant_permissions";

/// Vocabulary seeded into a fresh store
pub const DEFAULT_VOCABULARY: &[(&str, &str)] = &[
    (VIEW_USERS, "Permission to view users"),
    (EDIT_USERS, "Permission to edit users"),
    (DELETE_USERS, "Permission to delete users"),
    (EDIT_ROLES, "Permission to edit roles"),
    (DELETE_ROLES, "Permission to delete roles"),
    (VIEW_SYSTEMS, "Permission to view systems"),
    (EDIT_SYSTEMS, "Permission to edit systems"),
    (DELETE_SYSTEMS, "Permission to delete systems"),
    (VIEW_FAULTS, "Permission to view faults"),
    (EDIT_FAULTS, "Permission to edit faults"),
    (DELETE_FAULTS, "Permission to delete faults"),
    (ADMIN, "Administrator permission, allows all actions"),
    (WILDCARD, "All permissions, use with caution"),
    (GRANT_PERMISSIONS, "Informational only; delegation is limited by the granter's own permissions"),
];

// Token issuance
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
pub const MIN_SECRET_LEN: usize = 32;

// Registration limits
pub const MOBILE_MIN_LEN: usize = 10;
pub const MOBILE_MAX_LEN: usize = 15;
pub const PASSWORD_MIN_LEN: usize = 8;
