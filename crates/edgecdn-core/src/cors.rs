//! CORS rule matching.
//!
//! A tenant carries an ordered list of [`CorsRule`]s. For a request
//! `Origin`, an exact-origin rule always wins over a wildcard rule,
//! even when the wildcard rule appears first; among rules of the same
//! kind the first match wins. Header emission from the matched rule is
//! the HTTP layer's job.

use crate::tenant::CorsRule;

/// Match a request origin against the tenant's rules.
///
/// Returns the rule whose headers should decorate the response, or
/// `None` when no rule matches (no CORS headers are added then).
///
/// # Examples
///
/// ```
/// use edgecdn_core::cors::match_rules;
/// use edgecdn_core::tenant::CorsRule;
///
/// let rules = vec![CorsRule {
///     allowed_origins: vec!["*".to_owned()],
///     ..CorsRule::default()
/// }];
/// assert!(match_rules(&rules, "https://a.com").is_some());
/// ```
#[must_use]
pub fn match_rules<'a>(rules: &'a [CorsRule], origin: &str) -> Option<&'a CorsRule> {
    let mut wildcard = None;
    for rule in rules {
        if rule.allows_origin(origin) {
            return Some(rule);
        }
        if wildcard.is_none() && rule.allows_any_origin() {
            wildcard = Some(rule);
        }
    }
    wildcard
}
