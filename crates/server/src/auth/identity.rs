use pinguin_core::{Role, TenantId};

/// The resolved caller, attached to the request by C7's tenant-resolver
/// middleware and read back out of request extensions by every handler.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub tenant_id: TenantId,
    pub email: String,
    pub role: Role,
}
