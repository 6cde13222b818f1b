//! Property-based tests for the translator core.
//!
//! Covers signature parsing, channel-count propagation, method extraction,
//! rate resolution and slow-value propagation with randomized inputs.

use std::path::Path;

use proptest::prelude::*;
use ugenc_config::FileSettings;
use ugenc_core::signature::propagate_fixed;
use ugenc_core::{Param, Rate, Signature, Variant, extract, propagate, resolve};

/// A parameter type such as `ab`, `2b` or `c`.
fn param_type() -> impl Strategy<Value = String> {
    let rates = prop_oneof![Just("a"), Just("b"), Just("ab"), Just("ba")];
    prop_oneof![
        4 => (prop::option::of(1usize..5), rates)
            .prop_map(|(count, rates)| match count {
                Some(n) => format!("{n}{rates}"),
                None => rates.to_string(),
            }),
        1 => Just("c".to_string()),
    ]
}

fn output_type() -> impl Strategy<Value = String> {
    (prop::option::of(1usize..5), prop_oneof![Just("a"), Just("b")]).prop_map(
        |(count, rate)| match count {
            Some(n) => format!("{n}{rate}"),
            None => rate.to_string(),
        },
    )
}

fn signature_line() -> impl Strategy<Value = String> {
    (
        "[a-z][a-z0-9_]{0,6}",
        prop::collection::vec(("[a-z][a-z0-9_]{0,6}", param_type()), 0..5),
        output_type(),
    )
        .prop_map(|(name, params, output)| {
            let params: Vec<String> = params
                .iter()
                .map(|(name, ty)| format!("{name}: {ty}"))
                .collect();
            format!("{name}({}): {output}", params.join(", "))
        })
}

/// Statements with arbitrarily nested, balanced blocks.
fn block() -> impl Strategy<Value = String> {
    let leaf = "[a-z]{1,6}".prop_map(|s| format!("{s} = 1;\n"));
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop::collection::vec(inner, 0..4)
            .prop_map(|stmts| format!("if (c) {{\n{}}}\n", stmts.concat()))
    })
}

/// Distinct rate strings over {a, b} of one length, with an optional
/// position that is const in every variant.
fn variant_set() -> impl Strategy<Value = (Vec<Vec<Rate>>, Option<usize>)> {
    (1usize..5).prop_flat_map(|len| {
        let rate = prop_oneof![Just(Rate::Audio), Just(Rate::Block)];
        (
            prop::collection::vec(prop::collection::vec(rate, len), 1..6),
            prop::option::of(0..len),
        )
            .prop_map(|(candidates, const_pos)| {
                let mut variants: Vec<Vec<Rate>> = Vec::new();
                for mut rates in candidates {
                    if let Some(pos) = const_pos {
                        rates[pos] = Rate::Const;
                    }
                    if !variants.contains(&rates) {
                        variants.push(rates);
                    }
                }
                (variants, const_pos)
            })
    })
}

fn make_variants(rates: &[Vec<Rate>]) -> Vec<Variant> {
    let files = FileSettings::default();
    rates
        .iter()
        .map(|r| Variant::new("u", r.clone(), Rate::Audio, Path::new("."), &files))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Formatting a parsed signature and parsing it again gives the same
    /// signature.
    #[test]
    fn signature_round_trip(line in signature_line()) {
        let parsed = Signature::parse(&line, 1).unwrap();
        let formatted = parsed.to_string();
        let reparsed = Signature::parse(&formatted, 1).unwrap();
        prop_assert_eq!(&parsed, &reparsed, "{} formatted as {}", line, formatted);
    }

    /// After propagation, one pinned channel count pins every parameter and
    /// the output.
    #[test]
    fn fixed_propagates_everywhere(
        types in prop::collection::vec(param_type(), 0..6),
        output in output_type(),
    ) {
        let mut params: Vec<Param> = types
            .iter()
            .map(|t| Param::parse_type(t, 1).unwrap())
            .collect();
        let mut output = Param::parse_type(&output, 1).unwrap();
        let any_fixed = output.fixed || params.iter().any(|p| p.fixed);

        propagate_fixed(&mut params, &mut output);

        if any_fixed {
            prop_assert!(output.fixed);
            prop_assert!(params.iter().all(|p| p.fixed));
        } else {
            prop_assert!(!output.fixed);
            prop_assert!(params.iter().all(|p| !p.fixed));
        }
    }

    /// Extracted balanced bodies have matching brace counts, and absent
    /// methods are reported as absent.
    #[test]
    fn extraction_is_balanced(
        before in prop::collection::vec(block(), 0..3),
        body in prop::collection::vec(block(), 0..5),
        after in prop::collection::vec(block(), 0..3),
    ) {
        let text = format!(
            "class K : public dsp {{\n public:\n    void setup() {{\n{}    }}\n    void run(int n) {{\n{}    }}\n    void tail() {{\n{}    }}\n}};\n",
            before.concat(),
            body.concat(),
            after.concat(),
        );
        let method = extract("K", "run", &text, &[]).unwrap().unwrap();
        let span = method.text();
        prop_assert_eq!(span.matches('{').count(), span.matches('}').count());
        prop_assert!(
            span.starts_with("    void run(int n) {"),
            "span starts at the declaration: {:?}",
            span
        );
        prop_assert_eq!(method.body(), body.concat());

        prop_assert!(extract("K", "missing", &text, &[]).unwrap().is_none());
        prop_assert!(extract("Other", "run", &text, &[]).unwrap().is_none());
    }

    /// Resolution succeeds for every consistent variant set, and every input
    /// assignment reaches one routine whose rates match the converted inputs.
    /// An exact match needs no conversion.
    #[test]
    fn resolution_is_total_and_exact((rates, const_pos) in variant_set()) {
        let arity = rates[0].len();
        let variants = make_variants(&rates);
        let tree = resolve(&variants, arity).unwrap();

        for bits in 0u32..(1 << arity) {
            let input: Vec<Rate> = (0..arity)
                .map(|i| {
                    if Some(i) == const_pos {
                        Rate::Const
                    } else if bits & (1 << i) != 0 {
                        Rate::Audio
                    } else {
                        Rate::Block
                    }
                })
                .collect();
            let sel = tree.select(&input);

            let mut converted = input.clone();
            for &(param, conversion) in &sel.conversions {
                prop_assert!(conversion.applies_to(input[param]));
                converted[param] = conversion.target();
            }
            let chosen = &variants[sel.variant];
            prop_assert_eq!(&sel.routine, &chosen.routine_name());
            prop_assert_eq!(&converted, &chosen.rates);

            if rates.contains(&input) {
                prop_assert!(sel.conversions.is_empty());
                prop_assert_eq!(&chosen.rates, &input);
            }
        }
    }

    /// Running propagation again with its own result adds nothing.
    #[test]
    fn propagation_is_idempotent(
        defs in prop::collection::vec((0usize..3, prop::option::of(0usize..8)), 1..8),
        picked in prop::collection::vec(0usize..3, 0..3),
    ) {
        let mut body = String::new();
        for (i, (input, earlier)) in defs.iter().enumerate() {
            match earlier {
                Some(j) if *j < i => {
                    body.push_str(&format!("        float fSlow{i} = (fSlow{j} * 0.5f);\n"));
                }
                _ => body.push_str(&format!("        float fSlow{i} = float(*p{input}_samps);\n")),
            }
        }
        body.push_str("        for (int i0 = 0; (i0 < BL); i0 = (i0 + 1)) {\n");
        body.push_str("            *out_samps++ = fSlow0;\n        }\n");

        let names: Vec<String> = picked.iter().map(|k| format!("p{k}_samps")).collect();
        let first = propagate(&body, &names);
        let mut again = names.clone();
        again.extend(first.iter().cloned());
        prop_assert_eq!(propagate(&body, &again), first);
    }
}
