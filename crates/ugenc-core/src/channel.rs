//! Channel routine construction.
//!
//! A channel routine is one variant's `compute` method rewritten to process
//! a single channel of the generated unit: compiler inputs and controls
//! become the unit's parameter accessors, member variables become fields of
//! the per-channel state, and interpolated slow values are ramped.

use crate::error::UgenError;
use crate::extract::{extract, require_method};
use crate::implementation::Implementation;
use crate::interp::interpolate;
use crate::privates::PrivateVariable;
use crate::scanner::{expand_tabs, replace_ident};
use crate::signature::{Rate, Signature};
use crate::variant::Variant;

const UI_ADDERS: [&str; 3] = ["addNumEntry(", "addHorizontalSlider(", "addVerticalSlider("];

/// A signature parameter tied to the implementation parameters it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    /// Parameter name in the generated unit.
    pub name: String,
    /// Channel count.
    pub channels: usize,
    /// Implementation (`process`) names, one per channel.
    pub process_names: Vec<String>,
    /// True if any covered implementation parameter is interpolated.
    pub interpolated: bool,
    /// True for initialization-only parameters.
    pub is_const: bool,
}

impl ParamBinding {
    /// Accessor holding the parameter's samples, e.g. `amp_samps`.
    pub fn samps(&self) -> String {
        format!("{}_samps", self.name)
    }

    /// Expression for audio channel `j` of this parameter.
    fn audio_channel(&self, j: usize) -> String {
        if j == 0 {
            self.samps()
        } else {
            format!("({} + {j} * BL)", self.samps())
        }
    }

    /// Expression for the block value of channel `j`.
    fn block_channel(&self, j: usize) -> String {
        if self.channels == 1 {
            format!("*{}", self.samps())
        } else {
            format!("{}[{j}]", self.samps())
        }
    }
}

/// Tie each signature parameter to consecutive implementation parameters.
///
/// The signature must already be validated against `implementation`.
pub fn bind_params(signature: &Signature, implementation: &Implementation) -> Vec<ParamBinding> {
    let mut offset = 0;
    signature
        .params
        .iter()
        .map(|param| {
            let end = (offset + param.channels).min(implementation.param_names.len());
            let range = offset.min(end)..end;
            offset += param.channels;
            ParamBinding {
                name: param.name.clone(),
                channels: param.channels,
                process_names: implementation.param_names[range.clone()].to_vec(),
                interpolated: implementation.param_interp[range].iter().any(|&f| f),
                is_const: param.is_const(),
            }
        })
        .collect()
}

/// Control labels and the member fields they write, from
/// `buildUserInterface`, e.g. `("amp", "fEntry0")`.
pub fn control_fields(class_name: &str, text: &str) -> Result<Vec<(String, String)>, UgenError> {
    let Some(ui) = extract(class_name, "buildUserInterface", text, &[])? else {
        tracing::info!(class = class_name, "note: no buildUserInterface method");
        return Ok(Vec::new());
    };

    let mut fields = Vec::new();
    for line in ui.body_lines() {
        let Some(args) = UI_ADDERS
            .iter()
            .find_map(|adder| line.find(adder).map(|at| &line[at + adder.len()..]))
        else {
            continue;
        };
        let mut parts = args.splitn(3, ',');
        let label = parts.next().map(|s| s.trim().trim_matches('"'));
        let field = parts
            .next()
            .and_then(|s| s.trim().strip_prefix('&'))
            .map(|s| s.trim_end_matches(')').trim());
        match (label, field) {
            (Some(label), Some(field)) if !label.is_empty() && !field.is_empty() => {
                fields.push((label.to_string(), field.to_string()));
            }
            _ => tracing::warn!(class = class_name, line, "unrecognized control declaration"),
        }
    }
    Ok(fields)
}

/// Inputs shared by every routine of a unit.
#[derive(Debug, Clone, Copy)]
pub struct RoutineContext<'a> {
    /// Generated class name.
    pub class_name: &'a str,
    /// Unit output rate.
    pub output: Rate,
    /// Parameter bindings in signature order.
    pub params: &'a [ParamBinding],
    /// Members of the main variant's class.
    pub privates: &'a [PrivateVariable],
    /// Alternate names for `compute`.
    pub compute_aliases: &'a [String],
}

/// One generated channel routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRoutine {
    /// Routine name, e.g. `chan_ab_a`.
    pub name: String,
    /// Declaration line.
    pub declaration: String,
    /// Statements, one per line, each newline-terminated.
    pub body: String,
    /// Interpolated slow values.
    pub slow_vars: Vec<String>,
}

impl ChannelRoutine {
    /// Routine as a class member function.
    pub fn render(&self) -> String {
        format!("{}\n{}    }}\n", self.declaration, self.body)
    }
}

/// Build the channel routine for `variant` from its compiled `text`.
pub fn build_routine(
    ctx: &RoutineContext<'_>,
    variant: &Variant,
    text: &str,
) -> Result<ChannelRoutine, UgenError> {
    let text = expand_tabs(text);
    let class = ctx.class_name;
    let compute = require_method(class, "compute", &text, ctx.compute_aliases)?;

    let mut lines = compute.body_lines();
    if let Some(i) = lines.iter().position(|l| l.contains("FAUSTFLOAT* output0 =")) {
        lines.remove(i);
    }
    let mut body: String = lines.iter().map(|l| format!("{l}\n")).collect();

    if ctx.output == Rate::Audio {
        body = body.replace("output0[i0]", "*out_samps++");
    } else {
        body = body.replace("outputs[0]", "*out_samps++");
        body = prepend_control(class, &text, body)?;
    }
    body = replace_ident(&body, "count", "BL");

    let needs_controls = variant.rates.iter().any(|&r| r != Rate::Audio);
    let controls = if needs_controls {
        control_fields(class, &text)?
    } else {
        Vec::new()
    };

    let mut audio_input = 0;
    for (param, &rate) in ctx.params.iter().zip(&variant.rates) {
        if rate == Rate::Audio {
            for j in 0..param.channels {
                body = body.replace(&format!("inputs[{audio_input}]"), &param.audio_channel(j));
                audio_input += 1;
            }
            continue;
        }
        for (j, process_name) in param.process_names.iter().enumerate() {
            match controls.iter().find(|(label, _)| label == process_name) {
                Some((_, field)) => body = replace_ident(&body, field, &param.block_channel(j)),
                None => tracing::debug!(param = %param.name, "no control field in {variant}"),
            }
        }
    }

    for var in ctx.privates.iter().filter(|v| !v.is_const) {
        body = replace_ident(&body, &var.name, &format!("state->{}", var.name));
    }

    let mut slow_vars = Vec::new();
    if ctx.output == Rate::Audio {
        let ramped: Vec<String> = ctx
            .params
            .iter()
            .zip(&variant.rates)
            .filter(|(p, rate)| p.interpolated && **rate == Rate::Block)
            .map(|(p, _)| p.samps())
            .collect();
        let interpolated = interpolate(&body, &ramped);
        body = interpolated.body;
        slow_vars = interpolated.slow_vars;
    }

    let name = variant.routine_name();
    Ok(ChannelRoutine {
        declaration: format!("    void {name}({class}_state *state) {{"),
        name,
        body,
        slow_vars,
    })
}

/// Prepend the body of `control()`, turning `fControl[i]` into locals.
fn prepend_control(class: &str, text: &str, body: String) -> Result<String, UgenError> {
    let control = match extract(class, "control", text, &[])? {
        Some(control) => control.body(),
        None => {
            tracing::info!(class, "note: no control method");
            String::new()
        }
    };

    let mut body = control + &body;
    let mut i = 0;
    loop {
        let slot = format!("fControl[{i}]");
        if !body.contains(&slot) {
            break;
        }
        body = body.replace(&slot, &format!("tmp_{i}"));
        i += 1;
    }
    for j in 0..i {
        body = body.replacen(&format!("    tmp_{j} = "), &format!("    FAUSTFLOAT tmp_{j} = "), 1);
    }
    Ok(body)
}
