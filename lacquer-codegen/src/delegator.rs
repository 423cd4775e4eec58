//! Delegator alias and decorator factory functions.
//!
//! For `UserService` this emits:
//!
//! ```text
//! pub type UserServiceDelegator = DelegatorBuilder<dyn UserService>;
//! pub fn user_service_delegator(base) -> UserServiceDelegator
//! pub fn user_service_cache(layer) -> impl Fn(Arc<dyn UserService>) -> Arc<dyn UserService>
//! pub fn user_service_trace() -> impl Fn(Arc<dyn UserService>) -> Arc<dyn UserService>
//! ```
//!
//! Factories are registered outermost first:
//! `user_service_delegator(base).with(user_service_trace()).with(user_service_cache(layer)).build()`.

use crate::cache::{self, runtime};
use crate::emit::{self, SourceWriter};
use crate::plan::ContractPlan;
use crate::trace;
use lacquer_core::GeneratorConfig;

pub fn alias_name(contract: &str) -> String {
    format!("{}Delegator", contract)
}

pub fn emit_delegator(w: &mut SourceWriter, plan: &ContractPlan<'_>, config: &GeneratorConfig) {
    let rt = runtime(config);
    let contract = plan.name();
    let snake = emit::to_snake_case(contract);
    let alias = alias_name(contract);
    let layer_fn = format!(
        "impl Fn(Arc<dyn {0}>) -> Arc<dyn {0}> + Send + Sync + 'static",
        contract
    );

    w.line(format!(
        "/// Ordered decorator stack for [`{}`]. The first factory registered is the outermost layer.",
        contract
    ));
    w.line(format!(
        "pub type {} = {}::DelegatorBuilder<dyn {}>;",
        alias, rt, contract
    ));
    w.blank();

    w.open(format!(
        "pub fn {}_delegator(base: Arc<dyn {}>) -> {} {{",
        snake, contract, alias
    ));
    w.line(format!("{}::DelegatorBuilder::new(base)", rt));
    w.close("}");

    if plan.needs_cache_layer() {
        w.blank();
        w.open(format!(
            "pub fn {}_cache(layer: {}::CacheLayer) -> {} {{",
            snake, rt, layer_fn
        ));
        w.open(format!(
            "move |inner: Arc<dyn {0}>| -> Arc<dyn {0}> {{",
            contract
        ));
        w.line(format!(
            "Arc::new({}::new(inner, layer.clone()))",
            cache::decorator_name(contract)
        ));
        w.close("}");
        w.close("}");
    }

    if plan.needs_trace_layer() {
        w.blank();
        w.open(format!("pub fn {}_trace() -> {} {{", snake, layer_fn));
        w.open(format!(
            "|inner: Arc<dyn {0}>| -> Arc<dyn {0}> {{",
            contract
        ));
        w.line(format!("Arc::new({}::new(inner))", trace::decorator_name(contract)));
        w.close("}");
        w.close("}");
    }
}
