//! Access decision over a rule set

use tracing::trace;

use crate::rules::{AccessRule, Aid, ApplicationSelector, CertificateHash, RuleSet};

fn application_matches(application: &ApplicationSelector, hash: &CertificateHash) -> bool {
    match application {
        ApplicationSelector::Hashes(hashes) => hashes.contains(hash),
        ApplicationSelector::AllowAll | ApplicationSelector::DenyAll => true,
    }
}

/// Whether a single rule grants `hash` access to `aid`
pub fn rule_allows(rule: &AccessRule, hash: &CertificateHash, aid: &Aid) -> bool {
    rule.applet.matches(aid)
        && application_matches(&rule.application, hash)
        && rule.application != ApplicationSelector::DenyAll
}

/// Whether the application with certificate `hash` may access the applet `aid`
///
/// Access is granted when any rule allows it. A `DenyAll` rule only withholds
/// its own grant; it does not override a later rule that matches. An empty rule
/// set denies everything.
pub fn is_access_allowed(rules: &RuleSet, hash: &CertificateHash, aid: &Aid) -> bool {
    let allowed = rules.iter().any(|rule| rule_allows(rule, hash, aid));
    trace!(%aid, %hash, rules = rules.len(), allowed, "Evaluated access rules");
    allowed
}
