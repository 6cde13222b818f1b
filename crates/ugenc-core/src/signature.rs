//! Typed unit signatures.
//!
//! A signature line declares a unit's contract:
//!
//! ```text
//! sine(freq: ab, amp: ab): a
//! pan(x: 2a, where: b): 2a
//! osc(freq: a, phase: c): a
//! ```
//!
//! Each parameter clause is `name: [count]rates`, where the optional digits
//! pin the channel count at definition time and the rate letters list every
//! rate the parameter may assume (`a` audio, `b` block, `c` const). If any
//! parameter or the output pins its channel count, all of them are treated
//! as pinned.

use std::fmt;

use crate::error::UgenError;

/// Update frequency of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rate {
    /// One value per sample.
    Audio,
    /// One value per block.
    Block,
    /// Set at initialization only.
    Const,
}

impl Rate {
    /// All rates in canonical order.
    pub const ALL: [Rate; 3] = [Rate::Audio, Rate::Block, Rate::Const];

    /// Letter used in signatures and variant file names.
    pub const fn letter(self) -> char {
        match self {
            Rate::Audio => 'a',
            Rate::Block => 'b',
            Rate::Const => 'c',
        }
    }

    /// Parse a rate letter.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'a' => Some(Rate::Audio),
            'b' => Some(Rate::Block),
            'c' => Some(Rate::Const),
            _ => None,
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// The set of rates a parameter may assume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RateSpec {
    audio: bool,
    block: bool,
    constant: bool,
}

impl RateSpec {
    /// Audio rate only.
    pub const AUDIO: RateSpec = RateSpec::only(Rate::Audio);
    /// Block rate only.
    pub const BLOCK: RateSpec = RateSpec::only(Rate::Block);
    /// Const rate only.
    pub const CONST: RateSpec = RateSpec::only(Rate::Const);

    /// A spec containing exactly `rate`.
    pub const fn only(rate: Rate) -> Self {
        Self {
            audio: matches!(rate, Rate::Audio),
            block: matches!(rate, Rate::Block),
            constant: matches!(rate, Rate::Const),
        }
    }

    /// Parse a run of rate letters such as `"ab"`.
    ///
    /// Returns the first invalid character on failure, or `None` inside the
    /// error for an empty run.
    pub fn parse(letters: &str) -> Result<Self, Option<char>> {
        let mut spec = RateSpec::default();
        for ch in letters.chars() {
            let rate = Rate::from_letter(ch).ok_or(Some(ch))?;
            spec.insert(rate);
        }
        if spec.is_empty() {
            return Err(None);
        }
        Ok(spec)
    }

    /// Add `rate` to the set.
    pub fn insert(&mut self, rate: Rate) {
        match rate {
            Rate::Audio => self.audio = true,
            Rate::Block => self.block = true,
            Rate::Const => self.constant = true,
        }
    }

    /// True if `rate` is in the set.
    pub fn contains(self, rate: Rate) -> bool {
        match rate {
            Rate::Audio => self.audio,
            Rate::Block => self.block,
            Rate::Const => self.constant,
        }
    }

    /// Rates in canonical order.
    pub fn rates(self) -> impl Iterator<Item = Rate> {
        Rate::ALL.into_iter().filter(move |&r| self.contains(r))
    }

    /// Number of rates in the set.
    pub fn len(self) -> usize {
        self.rates().count()
    }

    /// True for the empty set.
    pub fn is_empty(self) -> bool {
        !(self.audio || self.block || self.constant)
    }

    /// The rate, if the set holds exactly one.
    pub fn single(self) -> Option<Rate> {
        let mut rates = self.rates();
        match (rates.next(), rates.next()) {
            (Some(rate), None) => Some(rate),
            _ => None,
        }
    }
}

impl fmt::Display for RateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rate in self.rates() {
            write!(f, "{rate}")?;
        }
        Ok(())
    }
}

/// A parameter of a signature, or the output (with an empty name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name; empty for the output.
    pub name: String,
    /// Channel count (1 unless pinned).
    pub channels: usize,
    /// True if the channel count is pinned at definition time.
    pub fixed: bool,
    /// Rates the parameter may assume.
    pub rates: RateSpec,
}

impl Param {
    /// Parse `name: [count]rates`.
    pub fn parse(clause: &str, line: usize) -> Result<Self, UgenError> {
        let Some((name, spec)) = clause.split_once(':') else {
            return Err(malformed(
                line,
                format!("expected '<name>:' in parameter '{}'", clause.trim()),
            ));
        };
        let name = name.trim();
        if name.is_empty() || !name.chars().all(crate::scanner::is_ident_char) {
            return Err(malformed(
                line,
                format!("'{name}' is not a parameter name"),
            ));
        }
        let mut param = Self::parse_type(spec, line)?;
        param.name = name.to_string();
        Ok(param)
    }

    /// Parse the unnamed `[count]rates` type of an output.
    pub fn parse_type(spec: &str, line: usize) -> Result<Self, UgenError> {
        let spec = spec.trim();
        if spec.contains(char::is_whitespace) {
            return Err(malformed(line, format!("unexpected space in type '{spec}'")));
        }
        let digits_end = spec
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(spec.len());
        let (digits, letters) = spec.split_at(digits_end);

        let fixed = !digits.is_empty();
        let channels = if fixed {
            match digits.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(malformed(
                        line,
                        format!("channel count '{digits}' must be a positive integer"),
                    ));
                }
            }
        } else {
            1
        };

        let rates = RateSpec::parse(letters).map_err(|bad| match bad {
            Some(ch) => malformed(line, format!("rate '{ch}' is not one of a, b, c")),
            None => malformed(line, format!("missing rate in '{spec}'")),
        })?;

        Ok(Self {
            name: String::new(),
            channels,
            fixed,
            rates,
        })
    }

    /// Pin the channel count.
    pub fn fix(&mut self) {
        self.fixed = true;
    }

    /// True for initialization-only parameters.
    pub fn is_const(&self) -> bool {
        self.rates == RateSpec::CONST
    }

    /// The `[count]rates` part, with the count omitted when not pinned.
    pub fn type_string(&self) -> String {
        if self.fixed {
            format!("{}{}", self.channels, self.rates)
        } else {
            self.rates.to_string()
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.type_string())
    }
}

/// The declared contract of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Unit name, e.g. `sine`.
    pub name: String,
    /// Parameters in declaration order.
    pub params: Vec<Param>,
    /// Output type.
    pub output: Param,
}

impl Signature {
    /// Parse one (possibly joined) signature line.
    pub fn parse(text: &str, line: usize) -> Result<Self, UgenError> {
        let Some(open) = text.find('(') else {
            return Err(malformed(line, "expected '(' after unit name"));
        };
        let name = text[..open].trim();
        if name.is_empty() || !name.chars().all(crate::scanner::is_ident_char) {
            return Err(malformed(line, format!("'{name}' is not a unit name")));
        }

        let rest = &text[open + 1..];
        let Some(close) = rest.find(')') else {
            return Err(malformed(line, "expected ')' after parameters"));
        };
        let Some(output_type) = rest[close + 1..].trim_start().strip_prefix(':') else {
            return Err(malformed(line, "expected '):' after parameters"));
        };

        let clauses = &rest[..close];
        let params = if clauses.trim().is_empty() {
            Vec::new()
        } else {
            clauses
                .split(',')
                .map(|clause| Param::parse(clause, line))
                .collect::<Result<Vec<_>, _>>()?
        };

        let output = Param::parse_type(output_type, line)?;
        if output.rates != RateSpec::AUDIO && output.rates != RateSpec::BLOCK {
            return Err(malformed(
                line,
                format!("output rate '{}' must be exactly 'a' or 'b'", output.rates),
            ));
        }

        let mut signature = Self {
            name: name.to_string(),
            params,
            output,
        };
        propagate_fixed(&mut signature.params, &mut signature.output);
        Ok(signature)
    }

    /// The single output rate.
    pub fn output_rate(&self) -> Rate {
        if self.output.rates.contains(Rate::Block) {
            Rate::Block
        } else {
            Rate::Audio
        }
    }

    /// Sum of declared parameter channel counts.
    pub fn channel_count(&self) -> usize {
        self.params.iter().map(|p| p.channels).sum()
    }

    /// Check const-rate rules and that the signature accounts for exactly
    /// `implementation_param_count` implementation parameters.
    pub fn validate(&self, implementation_param_count: usize) -> Result<(), UgenError> {
        for param in &self.params {
            if param.rates.contains(Rate::Const) && param.rates.len() != 1 {
                return Err(UgenError::InvalidConstSpec {
                    param: param.name.clone(),
                    reason: format!("'{}' combines 'c' with other rates", param.rates),
                });
            }
            if param.is_const() && param.channels != 1 {
                return Err(UgenError::InvalidConstSpec {
                    param: param.name.clone(),
                    reason: format!("const parameter has {} channels", param.channels),
                });
            }
        }

        let declared = self.channel_count();
        if declared != implementation_param_count {
            return Err(UgenError::ArityMismatch {
                unit: self.name.clone(),
                declared,
                found: implementation_param_count,
                what: "the process declaration".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, "): {}", self.output.type_string())
    }
}

/// If any parameter or the output pins its channel count, pin all of them.
pub fn propagate_fixed(params: &mut [Param], output: &mut Param) {
    let any_fixed = output.fixed || params.iter().any(|p| p.fixed);
    if any_fixed {
        for param in params.iter_mut() {
            param.fix();
        }
        output.fix();
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> UgenError {
    UgenError::MalformedSignature {
        line,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_signature() {
        let sig = Signature::parse("sine(freq: ab, amp: ab): a", 1).unwrap();
        assert_eq!(sig.name, "sine");
        assert_eq!(sig.params.len(), 2);
        assert_eq!(sig.params[0].name, "freq");
        assert!(sig.params[0].rates.contains(Rate::Audio));
        assert!(sig.params[0].rates.contains(Rate::Block));
        assert!(!sig.params[0].fixed);
        assert_eq!(sig.output_rate(), Rate::Audio);
    }

    #[test]
    fn parse_zero_parameters() {
        let sig = Signature::parse("noise(): a", 4).unwrap();
        assert!(sig.params.is_empty());
        assert_eq!(sig.to_string(), "noise(): a");
    }

    #[test]
    fn fixed_count_propagates_to_all() {
        let sig = Signature::parse("pan(x: 2a, where: b): a", 1).unwrap();
        assert!(sig.params.iter().all(|p| p.fixed));
        assert!(sig.output.fixed);
        assert_eq!(sig.params[0].channels, 2);
        assert_eq!(sig.params[1].channels, 1);
        assert_eq!(sig.to_string(), "pan(x: 2a, where: 1b): 1a");
    }

    #[test]
    fn fixed_output_propagates_to_params() {
        let sig = Signature::parse("stereo(x: a): 2a", 1).unwrap();
        assert!(sig.params[0].fixed);
    }

    #[test]
    fn whitespace_is_insignificant() {
        let a = Signature::parse("mult( x1 :a , x2:\tb ) : a", 1).unwrap();
        let b = Signature::parse("mult(x1: a, x2: b): a", 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn space_inside_a_name_is_rejected() {
        let err = Signature::parse("sine(fr eq: a): a", 3).unwrap_err();
        assert!(matches!(err, UgenError::MalformedSignature { line: 3, .. }));
        assert!(err.to_string().contains("'fr eq' is not a parameter name"));
    }

    #[test]
    fn space_inside_a_type_is_rejected() {
        assert!(Signature::parse("sine(freq: a b): a", 1).is_err());
        assert!(Signature::parse("pan(x: 2 a): a", 1).is_err());
        assert!(Signature::parse("sine(freq: a): 2 a", 1).is_err());
    }

    #[test]
    fn display_round_trips() {
        let text = "osc(freq: ab, phase: c): a";
        let sig = Signature::parse(text, 1).unwrap();
        assert_eq!(sig.to_string(), text);
        assert_eq!(Signature::parse(&sig.to_string(), 1).unwrap(), sig);
    }

    // --- malformed input ---

    #[test]
    fn clause_without_colon_is_malformed() {
        let err = Signature::parse("sine(freq a, amp: b): a", 7).unwrap_err();
        assert!(matches!(err, UgenError::MalformedSignature { line: 7, .. }));
    }

    #[test]
    fn missing_close_colon_is_malformed() {
        let err = Signature::parse("sine(freq: a, amp: b) a", 1).unwrap_err();
        assert!(matches!(err, UgenError::MalformedSignature { ref reason, .. } if reason.contains("'):'")));
    }

    #[test]
    fn missing_close_paren_is_malformed() {
        let err = Signature::parse("sine(freq: a, amp: b", 1).unwrap_err();
        assert!(matches!(err, UgenError::MalformedSignature { .. }));
    }

    #[test]
    fn bad_rate_letter_is_malformed() {
        let err = Signature::parse("sine(freq: ax): a", 1).unwrap_err();
        assert!(matches!(err, UgenError::MalformedSignature { ref reason, .. } if reason.contains("'x'")));
    }

    #[test]
    fn zero_channels_is_malformed() {
        assert!(Signature::parse("sine(freq: 0a): a", 1).is_err());
    }

    #[test]
    fn const_output_is_malformed() {
        assert!(Signature::parse("k(x: c): c", 1).is_err());
    }

    // --- validate ---

    #[test]
    fn validate_accepts_matching_arity() {
        let sig = Signature::parse("sine(freq: ab, amp: ab): a", 1).unwrap();
        assert!(sig.validate(2).is_ok());
    }

    #[test]
    fn validate_counts_channels() {
        let sig = Signature::parse("pan(x: 2a, where: b): 2a", 1).unwrap();
        assert!(sig.validate(3).is_ok());
        let err = sig.validate(2).unwrap_err();
        assert!(matches!(
            err,
            UgenError::ArityMismatch {
                declared: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_const_with_other_rates() {
        let sig = Signature::parse("osc(freq: a, phase: bc): a", 1).unwrap();
        let err = sig.validate(2).unwrap_err();
        assert!(matches!(err, UgenError::InvalidConstSpec { ref param, .. } if param == "phase"));
    }

    #[test]
    fn validate_rejects_multichannel_const() {
        let sig = Signature::parse("osc(freq: 1a, phase: 2c): 1a", 1).unwrap();
        let err = sig.validate(3).unwrap_err();
        assert!(matches!(err, UgenError::InvalidConstSpec { .. }));
    }

    #[test]
    fn rate_spec_single() {
        assert_eq!(RateSpec::AUDIO.single(), Some(Rate::Audio));
        assert_eq!(RateSpec::parse("ba").unwrap().single(), None);
        assert_eq!(RateSpec::parse("ba").unwrap().to_string(), "ab");
        assert_eq!(RateSpec::parse(""), Err(None));
        assert_eq!(RateSpec::parse("q"), Err(Some('q')));
    }
}
