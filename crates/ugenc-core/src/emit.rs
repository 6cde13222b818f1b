//! Serialization of a translated unit.
//!
//! A [`UnitModel`] holds everything the earlier stages derived for one unit.
//! [`HeaderFile`] renders the class definition (`sine.h`) and
//! [`RegistrationFile`] the entry points (`sine.cpp`). Rendering is pure; all
//! failures happen while building the model.
//!
//! The `O2SM INTERFACE` comments in the registration file are parsed by a
//! downstream interface generator and must keep their exact form.

use std::fmt::{self, Display, Formatter};

use ugenc_config::AdapterSettings;

use crate::channel::{ChannelRoutine, ParamBinding};
use crate::privates::PrivateVariable;
use crate::resolve::{Conversion, DispatchNode};
use crate::scanner::indent_lines;
use crate::signature::Rate;

const INDENT: &str = "    ";

/// Everything needed to render one unit.
#[derive(Debug, Clone)]
pub struct UnitModel {
    /// Unit name as declared, e.g. `sine`.
    pub unit: String,
    /// Generated class name, e.g. `Sine`.
    pub class_name: String,
    /// Output rate.
    pub output: Rate,
    /// Parameters in signature order.
    pub params: Vec<ParamBinding>,
    /// Compiler output preceding the class declaration.
    pub preamble: String,
    /// Members of the main variant's class.
    pub privates: Vec<PrivateVariable>,
    /// Constructor statements computing constants.
    pub constants: String,
    /// The `initialize_channel_states()` member.
    pub state_initializer: String,
    /// Decision tree; present for audio-rate units.
    pub dispatch: Option<DispatchNode>,
    /// Channel routines; a block-rate unit has exactly one.
    pub routines: Vec<ChannelRoutine>,
    /// Union of interpolated slow values across routines.
    pub slow_vars: Vec<String>,
    /// Parameters whose termination ends the unit.
    pub terminate: Vec<String>,
    /// One-time class initialization for the registration file.
    pub initializer: String,
}

impl UnitModel {
    fn is_audio(&self) -> bool {
        self.output == Rate::Audio
    }

    fn refreshed(&self) -> impl Iterator<Item = &ParamBinding> {
        self.params.iter().filter(|p| !p.is_const)
    }

    fn constant(&self) -> impl Iterator<Item = &ParamBinding> {
        self.params.iter().filter(|p| p.is_const)
    }
}

/// Number of preprocessor conditionals `text` opens but does not close.
fn open_conditionals(text: &str) -> usize {
    let mut depth = 0usize;
    for line in text.lines().map(str::trim_start) {
        if line.starts_with("#if") {
            depth += 1;
        } else if line.starts_with("#endif") {
            depth = depth.saturating_sub(1);
        }
    }
    depth
}

fn banner(f: &mut Formatter<'_>, unit: &str, namespace: &str) -> fmt::Result {
    writeln!(f, "/* {unit} -- unit generator for {namespace}")?;
    writeln!(f, " *")?;
    writeln!(f, " * generated by ugenc")?;
    writeln!(f, " */")?;
    writeln!(f)
}

// ---------------------------------------------------------------------------
// Definition file
// ---------------------------------------------------------------------------

/// The class definition file.
pub struct HeaderFile<'a> {
    /// Unit to render.
    pub model: &'a UnitModel,
    /// Entry point namespace, named in the banner.
    pub namespace: &'a str,
    /// Runtime adapter classes used by dispatch.
    pub adapters: &'a AdapterSettings,
}

impl Display for HeaderFile<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let m = self.model;
        let c = &m.class_name;

        banner(f, &m.unit, self.namespace)?;
        writeln!(f, "/*------------- BEGIN FAUST PREAMBLE -------------*/")?;
        writeln!(f)?;
        writeln!(f, "{}", m.preamble.trim_end_matches('\n'))?;
        writeln!(f, "/*-------------- END FAUST PREAMBLE --------------*/")?;
        writeln!(f)?;
        writeln!(f, "extern const char *{c}_name;")?;
        writeln!(f)?;
        writeln!(f, "class {c} : public Ugen {{")?;
        writeln!(f, "public:")?;

        self.state_struct(f)?;
        self.members(f)?;
        self.constructor(f)?;
        self.destructor(f)?;
        if let Some(tree) = &m.dispatch {
            self.update_run_channel(f, tree)?;
        }
        self.accessors(f)?;
        write!(f, "{}", m.state_initializer)?;
        writeln!(f)?;
        if m.is_audio() {
            for routine in &m.routines {
                write!(f, "{}", routine.render())?;
                writeln!(f)?;
            }
        }
        self.real_run(f)?;
        writeln!(f, "}};")?;
        for _ in 0..open_conditionals(&m.preamble) {
            writeln!(f, "#endif")?;
        }
        Ok(())
    }
}

impl HeaderFile<'_> {
    fn state_struct(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let m = self.model;
        let c = &m.class_name;
        writeln!(f, "    struct {c}_state {{")?;
        for var in m.privates.iter().filter(|v| !v.is_const) {
            writeln!(f, "        {}", var.declaration())?;
        }
        for var in &m.slow_vars {
            writeln!(f, "        Sample {var}_prev;")?;
        }
        writeln!(f, "    }};")?;
        writeln!(f, "    Vec<{c}_state> states;")?;
        if m.is_audio() {
            writeln!(f, "    void ({c}::*run_channel)({c}_state *state);")?;
        }
        writeln!(f)
    }

    fn members(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let m = self.model;
        for p in &m.params {
            writeln!(f, "    Ugen_ptr {};", p.name)?;
            writeln!(f, "    int {}_stride;", p.name)?;
            writeln!(f, "    Sample_ptr {};", p.samps())?;
            writeln!(f)?;
        }
        let mut any_const = false;
        for var in m.privates.iter().filter(|v| v.is_const) {
            writeln!(f, "    {}", var.declaration())?;
            any_const = true;
        }
        if any_const {
            writeln!(f)?;
        }
        Ok(())
    }

    fn constructor(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let m = self.model;
        let c = &m.class_name;
        write!(f, "    {c}(int id, int nchans")?;
        for p in &m.params {
            write!(f, ", Ugen_ptr {}_", p.name)?;
        }
        writeln!(f, ") :")?;
        writeln!(f, "            Ugen(id, '{}', nchans) {{", m.output.letter())?;
        for p in &m.params {
            writeln!(f, "        {0} = {0}_;", p.name)?;
        }
        if !m.params.is_empty() {
            writeln!(f, "        flags = CAN_TERMINATE;")?;
        }
        writeln!(f, "        states.set_size(chans);")?;
        write!(f, "{}", m.constants)?;
        for p in &m.params {
            writeln!(f, "        init_{0}({0});", p.name)?;
        }
        for p in m.constant() {
            writeln!(
                f,
                "        {} = {}->run(current_block); // initialization only",
                p.samps(),
                p.name
            )?;
        }
        if m.is_audio() {
            writeln!(f, "        run_channel = (void ({c}::*)({c}_state *)) 0;")?;
            writeln!(f, "        update_run_channel();")?;
        } else {
            writeln!(f, "        initialize_channel_states();")?;
        }
        writeln!(f, "    }}")?;
        writeln!(f)
    }

    fn destructor(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let m = self.model;
        let c = &m.class_name;
        writeln!(f, "    ~{c}() {{")?;
        for p in &m.params {
            writeln!(f, "        {}->unref();", p.name)?;
        }
        writeln!(f, "    }}")?;
        writeln!(f)?;
        writeln!(f, "    const char *classname() {{ return {c}_name; }}")?;
        writeln!(f)
    }

    fn update_run_channel(&self, f: &mut Formatter<'_>, tree: &DispatchNode) -> fmt::Result {
        let c = &self.model.class_name;
        writeln!(f, "    void update_run_channel() {{")?;
        writeln!(f, "        // initialize run_channel based on input types")?;
        writeln!(f, "        void ({c}::*new_run_channel)({c}_state *state);")?;
        self.dispatch_node(f, tree, 2)?;
        writeln!(f, "        if (new_run_channel != run_channel) {{")?;
        writeln!(f, "            initialize_channel_states();")?;
        writeln!(f, "            run_channel = new_run_channel;")?;
        writeln!(f, "        }}")?;
        writeln!(f, "    }}")?;
        writeln!(f)
    }

    fn dispatch_node(&self, f: &mut Formatter<'_>, node: &DispatchNode, depth: usize) -> fmt::Result {
        let ind = INDENT.repeat(depth);
        let param_name = |param: usize| {
            self.model
                .params
                .get(param)
                .map_or("", |p| p.name.as_str())
        };
        match node {
            DispatchNode::Branch { param, audio, block } => {
                let p = param_name(*param);
                writeln!(f, "{ind}if ({p}->rate == 'a') {{")?;
                self.dispatch_node(f, audio, depth + 1)?;
                writeln!(f, "{ind}}} else {{")?;
                self.dispatch_node(f, block, depth + 1)?;
                writeln!(f, "{ind}}}")
            }
            DispatchNode::Convert {
                param,
                conversion,
                next,
            } => {
                let p = param_name(*param);
                let adapters = self.adapters;
                match conversion {
                    Conversion::Upsample => {
                        writeln!(f, "{ind}if ({p}->rate != 'a') {{")?;
                        writeln!(
                            f,
                            "{ind}    {p} = new {}(-1, {p}->chans, {p});",
                            adapters.upsample
                        )?;
                    }
                    Conversion::Downsample => {
                        writeln!(f, "{ind}if ({p}->rate == 'a') {{")?;
                        writeln!(
                            f,
                            "{ind}    {p} = new {}(-1, {p}->chans, {p}, {});",
                            adapters.downsample, adapters.downsample_filter
                        )?;
                    }
                }
                writeln!(f, "{ind}}}")?;
                self.dispatch_node(f, next, depth)
            }
            DispatchNode::Routine { name, .. } => {
                writeln!(f, "{ind}new_run_channel = &{}::{name};", self.model.class_name)
            }
        }
    }

    fn accessors(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let m = self.model;
        let c = &m.class_name;

        if !m.params.is_empty() {
            writeln!(f, "    void print_sources(int indent, bool print_flag) {{")?;
            for p in &m.params {
                writeln!(f, "        {0}->print_tree(indent, print_flag, \"{0}\");", p.name)?;
            }
            writeln!(f, "    }}")?;
            writeln!(f)?;
        }

        for p in m.refreshed() {
            writeln!(f, "    void repl_{}(Ugen_ptr ugen) {{", p.name)?;
            writeln!(f, "        {}->unref();", p.name)?;
            writeln!(f, "        init_{}(ugen);", p.name)?;
            if m.is_audio() {
                writeln!(f, "        update_run_channel();")?;
            }
            writeln!(f, "    }}")?;
            writeln!(f)?;
        }

        for p in m.refreshed() {
            writeln!(f, "    void set_{}(int chan, float f) {{", p.name)?;
            writeln!(f, "        {0}->const_set(chan, f, \"{c}::set_{0}\");", p.name)?;
            writeln!(f, "    }}")?;
            writeln!(f)?;
        }

        for p in &m.params {
            writeln!(
                f,
                "    void init_{0}(Ugen_ptr ugen) {{ init_param(ugen, {0}, {0}_stride); }}",
                p.name
            )?;
            writeln!(f)?;
        }
        Ok(())
    }

    fn real_run(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let m = self.model;
        let c = &m.class_name;
        writeln!(f, "    void real_run() {{")?;
        for p in m.refreshed() {
            writeln!(f, "        {} = {}->run(current_block); // update input", p.samps(), p.name)?;
        }

        if !m.terminate.is_empty() {
            let sources: Vec<String> = m.terminate.iter().map(|t| format!("{t}->flags")).collect();
            writeln!(f, "        if ((({}) & TERMINATED) &&", sources.join(" | "))?;
            writeln!(f, "            (flags & CAN_TERMINATE)) {{")?;
            writeln!(f, "            terminate();")?;
            writeln!(f, "        }}")?;
        }

        writeln!(f, "        {c}_state *state = &states[0];")?;
        writeln!(f, "        for (int i = 0; i < chans; i++) {{")?;
        if m.is_audio() {
            writeln!(f, "            (this->*run_channel)(state);")?;
        } else if let Some(routine) = m.routines.first() {
            writeln!(f, "{}", indent_lines(&routine.body, 1))?;
        }
        writeln!(f, "            state++;")?;
        for p in &m.params {
            writeln!(f, "            {0}_samps += {0}_stride;", p.name)?;
        }
        writeln!(f, "        }}")?;
        for p in m.constant() {
            writeln!(f, "        {0}_samps -= chans * {0}_stride;", p.name)?;
        }
        writeln!(f, "    }}")
    }
}

// ---------------------------------------------------------------------------
// Registration file
// ---------------------------------------------------------------------------

/// The registration file exposing entry points.
pub struct RegistrationFile<'a> {
    /// Unit to render.
    pub model: &'a UnitModel,
    /// First path segment of every entry point.
    pub namespace: &'a str,
}

impl Display for RegistrationFile<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let m = self.model;
        let c = &m.class_name;
        let u = &m.unit;
        let ns = self.namespace;
        let prefix = format!("{ns}_{u}");

        banner(f, u, ns)?;
        writeln!(f, "#include \"arcougen.h\"")?;
        writeln!(f, "#include \"{u}.h\"")?;
        writeln!(f)?;
        writeln!(f, "const char *{c}_name = \"{c}\";")?;
        writeln!(f)?;

        let inputs: String = m.params.iter().map(|p| format!(", int32 {}", p.name)).collect();
        writeln!(f, "/* O2SM INTERFACE: /{ns}/{u}/new int32 id, int32 chans{inputs};")?;
        writeln!(f, " */")?;
        writeln!(f, "void {prefix}_new(O2SM_HANDLER_ARGS)")?;
        writeln!(f, "{{")?;
        unpack_markers(f)?;
        for p in &m.params {
            writeln!(f, "    ANY_UGEN_FROM_ID({0}_ugen, {0}, \"{prefix}_new\");", p.name)?;
        }
        let args: String = m.params.iter().map(|p| format!(", {}_ugen", p.name)).collect();
        writeln!(f)?;
        writeln!(f, "    new {c}(id, chans{args});")?;
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f)?;

        for p in m.refreshed() {
            let name = &p.name;
            writeln!(f, "/* O2SM INTERFACE: /{ns}/{u}/repl_{name} int32 id, int32 {name}_id;")?;
            writeln!(f, " */")?;
            writeln!(f, "static void {prefix}_repl_{name}(O2SM_HANDLER_ARGS)")?;
            writeln!(f, "{{")?;
            unpack_markers(f)?;
            writeln!(f, "    UGEN_FROM_ID({c}, {u}, id, \"{prefix}_repl_{name}\");")?;
            writeln!(f, "    ANY_UGEN_FROM_ID({name}, {name}_id, \"{prefix}_repl_{name}\");")?;
            writeln!(f, "    {u}->repl_{name}({name});")?;
            writeln!(f, "}}")?;
            writeln!(f)?;
            writeln!(f)?;

            writeln!(f, "/* O2SM INTERFACE: /{ns}/{u}/set_{name} int32 id, int32 chan, float val;")?;
            writeln!(f, " */")?;
            writeln!(f, "static void {prefix}_set_{name}(O2SM_HANDLER_ARGS)")?;
            writeln!(f, "{{")?;
            unpack_markers(f)?;
            writeln!(f, "    UGEN_FROM_ID({c}, {u}, id, \"{prefix}_set_{name}\");")?;
            writeln!(f, "    {u}->set_{name}(chan, val);")?;
            writeln!(f, "}}")?;
            writeln!(f)?;
            writeln!(f)?;
        }

        writeln!(f, "static void {u}_init()")?;
        writeln!(f, "{{")?;
        writeln!(f, "    // O2SM INTERFACE INITIALIZATION: (machine generated)")?;
        writeln!(
            f,
            "    o2sm_method_new(\"/{ns}/{u}/new\", \"ii{}\", {prefix}_new, NULL, true, true);",
            "i".repeat(m.params.len())
        )?;
        for p in m.refreshed() {
            let name = &p.name;
            writeln!(
                f,
                "    o2sm_method_new(\"/{ns}/{u}/repl_{name}\", \"ii\", {prefix}_repl_{name}, NULL, true, true);"
            )?;
            writeln!(
                f,
                "    o2sm_method_new(\"/{ns}/{u}/set_{name}\", \"iif\", {prefix}_set_{name}, NULL, true, true);"
            )?;
        }
        writeln!(f, "    // END INTERFACE INITIALIZATION")?;
        write!(f, "{}", m.initializer)?;
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f, "Initializer {u}_init_obj({u}_init);")
    }
}

fn unpack_markers(f: &mut Formatter<'_>) -> fmt::Result {
    writeln!(f, "    // begin unpack message (machine-generated):")?;
    writeln!(f, "    // end unpack message")?;
    writeln!(f)
}
