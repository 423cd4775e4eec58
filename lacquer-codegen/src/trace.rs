//! Tracing decorator synthesis.

use crate::cache::runtime;
use crate::emit::{self, SourceWriter};
use crate::plan::{ContractPlan, MethodPlan, TracePlan};
use lacquer_core::GeneratorConfig;

pub fn decorator_name(contract: &str) -> String {
    format!("{}Trace", contract)
}

/// Emit the tracing decorator struct and its trait impl.
pub fn emit_trace_decorator(w: &mut SourceWriter, plan: &ContractPlan<'_>, config: &GeneratorConfig) {
    let rt = runtime(config);
    let contract = plan.name();
    let name = decorator_name(contract);

    w.line(format!("/// Tracing decorator for [`{}`].", contract));
    w.open(format!("pub struct {} {{", name));
    w.line(format!("inner: Arc<dyn {}>,", contract));
    w.close("}");
    w.blank();

    w.open(format!("impl {} {{", name));
    w.open(format!("pub fn new(inner: Arc<dyn {}>) -> Self {{", contract));
    w.line("Self { inner }");
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
        match &method.trace {
            Some(trace) => emit_traced_body(w, method, trace, &rt),
            None => w.line(emit::forward_call(method.spec)),
        }
        w.close("}");
    }
    w.close("}");
}

fn emit_traced_body(w: &mut SourceWriter, method: &MethodPlan<'_>, trace: &TracePlan, rt: &str) {
    w.open(format!("let __span = {}::tracing::info_span!(", rt));
    w.line(format!("{},", emit::string_literal(&trace.span_name)));
    for attr in &trace.attributes {
        w.line(format!("{0} = ?{0},", attr));
    }
    w.line(format!("otel.status_code = {}::tracing::field::Empty", rt));
    w.close(");");
    w.line(format!(
        "{}::trace::traced(__span, self.inner.{}({})).await",
        rt,
        method.spec.name,
        emit::forward_args(method.spec)
    ));
}
