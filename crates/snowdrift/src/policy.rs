/// A predicate over the caller-supplied identity string, consulted before
/// any sequence state is touched.
///
/// Implementations must be cheap (no I/O, ideally no allocation): the check
/// runs on every generation request.
pub trait AgentPolicy {
    /// Returns whether the caller may be issued an ID. `None` means the
    /// front end observed no identity at all.
    fn is_allowed(&self, caller: Option<&str>) -> bool;
}

/// The default policy: every caller is allowed, identity or not.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AgentPolicy for AllowAll {
    fn is_allowed(&self, _caller: Option<&str>) -> bool {
        true
    }
}

/// Requires a well-formed `product/version` user agent.
///
/// A missing or empty identity is rejected, as is anything that does not
/// split into a non-empty product and a non-empty version. This filters the
/// bulk of anonymous automation without maintaining a signature list.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserAgentPolicy;

impl AgentPolicy for UserAgentPolicy {
    fn is_allowed(&self, caller: Option<&str>) -> bool {
        let Some(agent) = caller else {
            return false;
        };
        let Some((product, version)) = agent.split_once('/') else {
            return false;
        };
        !product.is_empty() && !version.is_empty() && !version.contains('/')
    }
}
