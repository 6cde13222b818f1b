//! One-time initialization code carried over from the compiled class.
//!
//! - `classInit` and `staticInit` run once per process, in the
//!   registration file's init function.
//! - `instanceConstants` runs in the generated constructor.
//! - `instanceClear` resets each channel's state.

use crate::error::UgenError;
use crate::extract::extract;
use crate::privates::PrivateVariable;
use crate::scanner::{dedent_once, replace_ident};
use crate::signature::Rate;

const STATIC_TEMPORARIES: [&str; 4] = ["iVec", "iRec", "fVec", "fRec"];

/// Runtime name of the sample rate for a unit of the given output rate.
pub fn rate_name(output: Rate) -> &'static str {
    if output == Rate::Audio { "AR" } else { "BR" }
}

/// Class-level initialization code for the registration file.
///
/// Empty when the class defines neither `classInit` nor `staticInit`.
pub fn class_initializer(class_name: &str, text: &str, output: Rate) -> Result<String, UgenError> {
    let rate = rate_name(output);
    let mut code = String::new();

    match extract(class_name, "classInit", text, &[])? {
        Some(method) if !method.body_lines().is_empty() => {
            code.push_str("\n    // class initialization code from faust:\n");
            for line in method.body_lines() {
                code.push_str(&replace_ident(dedent_once(line), "sample_rate", rate));
                code.push('\n');
            }
        }
        Some(_) => {}
        None => tracing::info!(class = class_name, "note: no classInit method"),
    }

    match extract(class_name, "staticInit", text, &[])? {
        Some(method) if !method.body_lines().is_empty() => {
            let lines: Vec<String> = method
                .body_lines()
                .iter()
                .map(|line| replace_ident(dedent_once(line), "sample_rate", rate))
                .collect();
            code.push_str("\n    // \"static\" initialization code from faust:\n");
            for (name, len) in static_temporaries(&lines) {
                let ty = if name.starts_with('f') { "float" } else { "int" };
                code.push_str(&format!("    {ty} {name}[{len}];\n"));
            }
            for line in &lines {
                code.push_str(line);
                code.push('\n');
            }
        }
        Some(_) => {}
        None => tracing::debug!(class = class_name, "no staticInit method"),
    }
    Ok(code)
}

/// Member arrays that `staticInit` uses as temporaries, with lengths one
/// past the largest constant subscript assigned.
fn static_temporaries(lines: &[String]) -> Vec<(String, usize)> {
    let mut found: Vec<(String, usize)> = Vec::new();
    for line in lines {
        let mut tokens = line.split_whitespace();
        let (Some(token), Some(_)) = (tokens.next(), tokens.next()) else {
            continue;
        };
        if !STATIC_TEMPORARIES.iter().any(|p| token.starts_with(p)) {
            continue;
        }
        let Some((name, rest)) = token.split_once('[') else {
            continue;
        };
        let Some(Ok(index)) = rest.split_once(']').map(|(i, _)| i.parse::<usize>()) else {
            continue;
        };
        match found.iter_mut().find(|(n, _)| n == name) {
            Some((_, len)) => *len = (*len).max(index + 1),
            None => found.push((name.to_string(), index + 1)),
        }
    }
    found
}

/// Body of `instanceConstants` for the constructor, with the sample-rate
/// assignment dropped and the sample rate read from the runtime.
pub fn instance_constants(class_name: &str, text: &str, output: Rate) -> Result<String, UgenError> {
    let Some(method) = extract(class_name, "instanceConstants", text, &[])? else {
        tracing::info!(class = class_name, "note: no instanceConstants method");
        return Ok(String::new());
    };
    let rate = rate_name(output);
    Ok(method
        .body_lines()
        .iter()
        .filter(|line| !line.contains("fSampleRate = "))
        .map(|line| format!("{}\n", replace_ident(line, "fSampleRate", rate)))
        .collect())
}

/// The generated `initialize_channel_states()` member.
///
/// Runs `instanceClear` for every channel, then zeroes each interpolation
/// `_prev` field.
pub fn state_initializer(
    class_name: &str,
    text: &str,
    privates: &[PrivateVariable],
    slow_vars: &[String],
) -> Result<String, UgenError> {
    let mut clear = match extract(class_name, "instanceClear", text, &[])? {
        Some(method) => method
            .body_lines()
            .iter()
            .map(|line| format!("    {line}\n"))
            .collect(),
        None => {
            tracing::info!(class = class_name, "note: no instanceClear method");
            String::new()
        }
    };
    for var in privates.iter().filter(|v| !v.is_const) {
        clear = replace_ident(&clear, &var.name, &format!("states[i].{}", var.name));
    }

    let mut out = String::from("    void initialize_channel_states() {\n");
    out.push_str("        for (int i = 0; i < chans; i++) {\n");
    out.push_str(&clear);
    for var in slow_vars {
        out.push_str(&format!("            states[i].{var}_prev = 0.0f;\n"));
    }
    out.push_str("        }\n    }\n");
    Ok(out)
}
