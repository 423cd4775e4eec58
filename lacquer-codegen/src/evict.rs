//! Eviction synthesis.
//!
//! Evict keys are rendered before the base call, since owned arguments are
//! moved into it, and handed to `CacheLayer::evict_on_success` together with
//! the call's result. Only a successful call deletes anything; a failed
//! delete is logged at run time and never replaces the result.
//!
//! On a cached method the list goes to `CacheLayer::get_or_populate_and_evict`
//! instead, so a value served from the cache evicts nothing.

use crate::emit::{self, SourceWriter};
use crate::plan::EvictPlan;

/// `let __evict = vec![...];`
pub fn emit_evict_list(w: &mut SourceWriter, plan: &EvictPlan, rt: &str) {
    w.open("let __evict = vec![");
    for key in &plan.keys {
        w.line(format!("{},", key.to_rust_expr(rt)));
    }
    w.close("];");
}

/// Tail expression applying `__evict` to `__result`.
pub fn emit_evict_on_success(w: &mut SourceWriter, label: &str) {
    w.line("self.layer");
    w.indent();
    w.line(format!(
        ".evict_on_success({}, __evict, __result)",
        emit::string_literal(label)
    ));
    w.line(".await");
    w.dedent();
}
