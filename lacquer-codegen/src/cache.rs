//! Cache decorator synthesis.
//!
//! The decorator owns the inner implementation and a `CacheLayer`. Each
//! cached method computes its key up front and hands `get_or_populate` a
//! loader closure that can be re-run by a background refresh, so every
//! argument is captured by value:
//!
//! ```text
//! &T      -> captured with to_owned(), passed as &param
//! T       -> moved in, cloned per call
//! ```
//!
//! `&mut T` parameters are rejected on cached methods during validation.
//!
//! Methods with an evict policy are handled here too; see [`crate::evict`].

use crate::emit::{self, Passing, SourceWriter};
use crate::evict;
use crate::plan::{CachePlan, ContractPlan, MethodPlan};
use lacquer_core::GeneratorConfig;

/// Name of the decorator struct for `contract`.
pub fn decorator_name(contract: &str) -> String {
    format!("{}Cache", contract)
}

/// Name of the `CacheSettings` constant for one method.
pub fn settings_const(contract: &str, method: &str) -> String {
    format!(
        "{}_{}_CACHE",
        emit::to_upper_snake_case(contract),
        emit::to_upper_snake_case(method)
    )
}

/// Emit the settings constants, the decorator struct and its trait impl.
pub fn emit_cache_decorator(w: &mut SourceWriter, plan: &ContractPlan<'_>, config: &GeneratorConfig) {
    let rt = runtime(config);
    let contract = plan.name();
    let name = decorator_name(contract);

    for method in &plan.methods {
        if let Some(cache) = &method.cache {
            emit_settings(w, contract, method, cache, &rt);
            w.blank();
        }
    }

    w.line(format!("/// Caching decorator for [`{}`].", contract));
    w.open(format!("pub struct {} {{", name));
    w.line(format!("inner: Arc<dyn {}>,", contract));
    w.line(format!("layer: {}::CacheLayer,", rt));
    w.close("}");
    w.blank();

    w.open(format!("impl {} {{", name));
    w.open(format!(
        "pub fn new(inner: Arc<dyn {}>, layer: {}::CacheLayer) -> Self {{",
        contract, rt
    ));
    w.line("Self { inner, layer }");
    w.close("}");
    w.close("}");
    w.blank();

    w.line(format!("#[{}]", config.async_trait_path));
    w.open(format!("impl {} for {} {{", contract, name));
    for (idx, method) in plan.methods.iter().enumerate() {
        if idx > 0 {
            w.blank();
        }
        w.open(format!("{} {{", emit::method_signature(method.spec)));
        emit_method_body(w, contract, method, &rt);
        w.close("}");
    }
    w.close("}");
}

fn emit_settings(w: &mut SourceWriter, contract: &str, method: &MethodPlan<'_>, cache: &CachePlan, rt: &str) {
    w.open(format!(
        "const {}: {}::CacheSettings = {}::CacheSettings {{",
        settings_const(contract, &method.spec.name),
        rt,
        rt
    ));
    w.line(format!("method: {},", emit::string_literal(&method.label(contract))));
    w.line(format!(
        "ttl: ::std::time::Duration::from_millis({}),",
        cache.ttl.as_millis()
    ));
    w.line(format!("jitter_percent: {:?},", cache.jitter_percent));
    w.line(format!(
        "refresh_threshold_percent: {:?},",
        cache.refresh_threshold_percent
    ));
    w.close("};");
}

fn emit_method_body(w: &mut SourceWriter, contract: &str, method: &MethodPlan<'_>, rt: &str) {
    match (&method.cache, &method.evict) {
        (Some(cache), evict_plan) => {
            if let Some(plan) = evict_plan {
                evict::emit_evict_list(w, plan, rt);
            }
            emit_get_or_populate(w, contract, method, cache, rt, evict_plan.is_some());
        }
        (None, Some(plan)) => {
            evict::emit_evict_list(w, plan, rt);
            w.line(format!("let __result = {};", emit::forward_call(method.spec)));
            evict::emit_evict_on_success(w, &method.label(contract));
        }
        (None, None) => w.line(emit::forward_call(method.spec)),
    }
}

/// With `evicting`, `__evict` is already bound and is handed to the layer,
/// which deletes it only when the base method actually ran.
fn emit_get_or_populate(
    w: &mut SourceWriter,
    contract: &str,
    method: &MethodPlan<'_>,
    cache: &CachePlan,
    rt: &str,
    evicting: bool,
) {
    let spec = method.spec;
    let settings = settings_const(contract, &spec.name);

    w.line(format!("let __key = {};", cache.key.to_rust_expr(rt)));
    w.line("let __inner = Arc::clone(&self.inner);");
    for param in &spec.params {
        if Passing::of(param) == Passing::Shared {
            w.line(format!("let {0} = {0}.to_owned();", param.name));
        }
    }

    w.line("self");
    w.indent();
    w.line(".layer");
    if evicting {
        w.open(format!(
            ".get_or_populate_and_evict(&{}, __key, __evict, move || {{",
            settings
        ));
    } else {
        w.open(format!(".get_or_populate(&{}, __key, move || {{", settings));
    }
    w.line("let __inner = Arc::clone(&__inner);");
    let mut args = Vec::with_capacity(spec.params.len());
    for param in &spec.params {
        w.line(format!("let {0} = {0}.clone();", param.name));
        match Passing::of(param) {
            Passing::Shared => args.push(format!("&{}", param.name)),
            Passing::Owned => args.push(param.name.clone()),
        }
    }
    w.line(format!(
        "async move {{ __inner.{}({}).await }}",
        spec.name,
        args.join(", ")
    ));
    w.close("})");
    w.line(".await");
    w.dedent();
}

pub(crate) fn runtime(config: &GeneratorConfig) -> String {
    config.runtime_path.trim_end_matches("::").to_string()
}
