//! Port fitted trees to C / C++ source for microcontrollers
//!
//! The generated code has no dependencies beyond `<stdint.h>`: every tree is
//! unrolled into nested `if`/`else` blocks on the feature vector `x`, and a
//! forest accumulates `uint8_t` votes before taking the argmax. Ties resolve
//! to the lowest class index, the same rule [`RandomForest::predict`] uses.
//! Firmware reads features as `float`, so it matches the host on inputs that
//! are exactly representable in single precision; values within float
//! rounding of a threshold may land on the other branch.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::error::{MicroforestError, Result};
use crate::training::{DecisionTree, RandomForest, TreeNode};

/// Largest tree or class count that fits the `uint8_t` vote counters
const MAX_U8_COUNT: usize = u8::MAX as usize;

/// Flavour of generated source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExportFormat {
    /// C++ header with an `Eloquent::ML::Port` class, Arduino friendly
    #[default]
    Eloquent,
    /// Plain C99 header of `static inline` functions
    PlainC,
}

/// A fitted model that can be unrolled into source code
pub trait PortableModel {
    /// Class name used in the generated C++ code
    fn port_name(&self) -> &'static str;

    /// Root of every tree, in vote order
    fn port_trees(&self) -> Result<Vec<&TreeNode>>;

    /// Feature vector length the model expects
    fn port_n_features(&self) -> usize;

    /// Size of the label space
    fn port_n_classes(&self) -> usize;

    /// Whether predictions combine several trees by vote
    fn is_ensemble(&self) -> bool;
}

impl PortableModel for DecisionTree {
    fn port_name(&self) -> &'static str {
        "DecisionTree"
    }

    fn port_trees(&self) -> Result<Vec<&TreeNode>> {
        self.root()
            .map(|root| vec![root])
            .ok_or(MicroforestError::ModelNotFitted)
    }

    fn port_n_features(&self) -> usize {
        self.n_features()
    }

    fn port_n_classes(&self) -> usize {
        self.n_classes()
    }

    fn is_ensemble(&self) -> bool {
        false
    }
}

impl PortableModel for RandomForest {
    fn port_name(&self) -> &'static str {
        "RandomForest"
    }

    fn port_trees(&self) -> Result<Vec<&TreeNode>> {
        if self.trees().is_empty() {
            return Err(MicroforestError::ModelNotFitted);
        }
        self.trees()
            .iter()
            .map(|tree| tree.root().ok_or(MicroforestError::ModelNotFitted))
            .collect()
    }

    fn port_n_features(&self) -> usize {
        self.n_features()
    }

    fn port_n_classes(&self) -> usize {
        self.n_classes()
    }

    fn is_ensemble(&self) -> bool {
        true
    }
}

/// Exporter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output flavour
    pub format: ExportFormat,
    /// Name per class index, emitted by `idxToLabel`
    pub class_names: Vec<String>,
    /// Identifier prefix for plain C functions and macros
    pub prefix: String,
    /// Stamp the generation time into the header comment
    pub timestamp: bool,
}

impl ExportConfig {
    /// Settings for a model whose classes are named `class_names`
    pub fn new(class_names: Vec<String>) -> Self {
        Self {
            format: ExportFormat::default(),
            class_names,
            prefix: "classifier".to_string(),
            timestamp: true,
        }
    }

    /// Set output flavour
    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Set identifier prefix (sanitized into a C identifier)
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = c_identifier(prefix);
        self
    }

    /// Enable or disable the generation timestamp
    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Turns fitted models into firmware source
pub struct CodeExporter {
    config: ExportConfig,
}

impl CodeExporter {
    /// Create new exporter
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Render `model` to a source string
    pub fn port<M: PortableModel>(&self, model: &M) -> Result<String> {
        let trees = model.port_trees()?;
        let n_classes = model.port_n_classes();

        if trees.len() > MAX_U8_COUNT {
            return Err(MicroforestError::UnsupportedModel(format!(
                "{} trees exceed the {} votes a uint8_t counter can hold",
                trees.len(),
                MAX_U8_COUNT
            )));
        }
        if n_classes == 0 || n_classes > MAX_U8_COUNT {
            return Err(MicroforestError::UnsupportedModel(format!(
                "{} classes; between 1 and {} are supported",
                n_classes, MAX_U8_COUNT
            )));
        }
        if self.config.class_names.len() != n_classes {
            return Err(MicroforestError::ValidationError(format!(
                "{} class names given for a model with {} classes",
                self.config.class_names.len(),
                n_classes
            )));
        }

        let mut buffer = Vec::new();
        match self.config.format {
            ExportFormat::Eloquent => self.write_eloquent(&mut buffer, model, &trees)?,
            ExportFormat::PlainC => self.write_plain_c(&mut buffer, model, &trees)?,
        }

        String::from_utf8(buffer)
            .map_err(|e| MicroforestError::SerializationError(format!("Invalid UTF-8: {}", e)))
    }

    fn write_banner<W: Write, M: PortableModel>(&self, w: &mut W, model: &M, n_trees: usize) -> Result<()> {
        let version = env!("CARGO_PKG_VERSION");
        if self.config.timestamp {
            writeln!(
                w,
                "// Generated by microforest {} on {}",
                version,
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
            )
            .map_err(Self::io_err)?;
        } else {
            writeln!(w, "// Generated by microforest {}", version).map_err(Self::io_err)?;
        }
        writeln!(
            w,
            "// {}: {} tree(s), {} features, {} classes",
            model.port_name(),
            n_trees,
            model.port_n_features(),
            model.port_n_classes()
        )
        .map_err(Self::io_err)?;
        Ok(())
    }

    fn write_eloquent<W: Write, M: PortableModel>(
        &self,
        w: &mut W,
        model: &M,
        trees: &[&TreeNode],
    ) -> Result<()> {
        let n_classes = model.port_n_classes();
        self.write_banner(w, model, trees.len())?;

        line(w, 0, "#pragma once")?;
        line(w, 0, "#include <stdint.h>")?;
        line(w, 0, "namespace Eloquent {")?;
        line(w, 1, "namespace ML {")?;
        line(w, 2, "namespace Port {")?;
        line(w, 3, &format!("class {} {{", model.port_name()))?;
        line(w, 4, "public:")?;
        line(w, 5, "/**")?;
        line(w, 5, "* Predict class for features vector")?;
        line(w, 5, "*/")?;
        line(w, 5, "int predict(float *x) {")?;

        if model.is_ensemble() {
            line(w, 6, &format!("uint8_t votes[{}] = {{ 0 }};", n_classes))?;
            for (i, root) in trees.iter().enumerate() {
                line(w, 6, &format!("// tree #{}", i + 1))?;
                write_node(w, root, 6, &|class| format!("votes[{}] += 1;", class))?;
                line(w, 0, "")?;
            }
            line(w, 6, "// return argmax of votes")?;
            write_argmax(w, 6, n_classes, "classIdx", "maxVotes")?;
            line(w, 6, "return classIdx;")?;
        } else {
            write_node(w, trees[0], 6, &|class| format!("return {};", class))?;
        }
        line(w, 5, "}")?;
        line(w, 0, "")?;

        line(w, 5, "/**")?;
        line(w, 5, "* Predict readable class name")?;
        line(w, 5, "*/")?;
        line(w, 5, "const char* predictLabel(float *x) {")?;
        line(w, 6, "return idxToLabel(predict(x));")?;
        line(w, 5, "}")?;
        line(w, 0, "")?;

        line(w, 5, "/**")?;
        line(w, 5, "* Convert class idx to readable name")?;
        line(w, 5, "*/")?;
        line(w, 5, "const char* idxToLabel(uint8_t classIdx) {")?;
        self.write_label_switch(w, 6, "classIdx")?;
        line(w, 5, "}")?;
        line(w, 0, "")?;

        line(w, 4, "protected:")?;
        line(w, 3, "};")?;
        line(w, 2, "}")?;
        line(w, 1, "}")?;
        line(w, 0, "}")?;
        Ok(())
    }

    fn write_plain_c<W: Write, M: PortableModel>(
        &self,
        w: &mut W,
        model: &M,
        trees: &[&TreeNode],
    ) -> Result<()> {
        let prefix = &self.config.prefix;
        let upper = prefix.to_uppercase();
        let n_classes = model.port_n_classes();
        self.write_banner(w, model, trees.len())?;

        line(w, 0, &format!("#ifndef {}_H", upper))?;
        line(w, 0, &format!("#define {}_H", upper))?;
        line(w, 0, "")?;
        line(w, 0, "#include <stdint.h>")?;
        line(w, 0, "")?;
        line(w, 0, &format!("#define {}_N_FEATURES {}", upper, model.port_n_features()))?;
        line(w, 0, &format!("#define {}_N_CLASSES {}", upper, n_classes))?;
        line(w, 0, "")?;

        for (i, root) in trees.iter().enumerate() {
            line(w, 0, &format!("static inline int {}_tree_{}(const float *x) {{", prefix, i))?;
            write_node(w, root, 1, &|class| format!("return {};", class))?;
            line(w, 0, "}")?;
            line(w, 0, "")?;
        }

        line(w, 0, &format!("static inline int {}_predict(const float *x) {{", prefix))?;
        line(w, 1, &format!("uint8_t votes[{}] = {{ 0 }};", n_classes))?;
        for i in 0..trees.len() {
            line(w, 1, &format!("votes[{}_tree_{}(x)] += 1;", prefix, i))?;
        }
        write_argmax(w, 1, n_classes, "class_idx", "max_votes")?;
        line(w, 1, "return class_idx;")?;
        line(w, 0, "}")?;
        line(w, 0, "")?;

        line(w, 0, &format!("static inline const char *{}_idx_to_label(int class_idx) {{", prefix))?;
        self.write_label_switch(w, 1, "class_idx")?;
        line(w, 0, "}")?;
        line(w, 0, "")?;
        line(w, 0, &format!("#endif /* {}_H */", upper))?;
        Ok(())
    }

    fn write_label_switch<W: Write>(&self, w: &mut W, indent: usize, var: &str) -> Result<()> {
        line(w, indent, &format!("switch ({}) {{", var))?;
        for (i, name) in self.config.class_names.iter().enumerate() {
            line(w, indent + 1, &format!("case {}:", i))?;
            line(w, indent + 1, &format!("return \"{}\";", escape_c(name)))?;
        }
        line(w, indent + 1, "default:")?;
        line(w, indent + 1, "return \"unknown\";")?;
        line(w, indent, "}")?;
        Ok(())
    }

    fn io_err(e: std::io::Error) -> MicroforestError {
        MicroforestError::SerializationError(format!("Failed to write source: {}", e))
    }
}

fn line<W: Write>(w: &mut W, indent: usize, text: &str) -> Result<()> {
    if text.is_empty() {
        writeln!(w).map_err(CodeExporter::io_err)
    } else {
        writeln!(w, "{}{}", "    ".repeat(indent), text).map_err(CodeExporter::io_err)
    }
}

fn write_node<W: Write>(
    w: &mut W,
    node: &TreeNode,
    indent: usize,
    leaf: &dyn Fn(usize) -> String,
) -> Result<()> {
    match node {
        TreeNode::Leaf { class, .. } => line(w, indent, &leaf(*class)),
        TreeNode::Split { feature_idx, threshold, left, right, .. } => {
            if !threshold.is_finite() {
                return Err(MicroforestError::UnsupportedModel(format!(
                    "threshold {} on feature {} has no C literal",
                    threshold, feature_idx
                )));
            }
            line(w, indent, &format!("if (x[{}] <= {:?}) {{", feature_idx, threshold))?;
            write_node(w, left, indent + 1, leaf)?;
            line(w, indent, "}")?;
            line(w, indent, "else {")?;
            write_node(w, right, indent + 1, leaf)?;
            line(w, indent, "}")
        }
    }
}

fn write_argmax<W: Write>(
    w: &mut W,
    indent: usize,
    n_classes: usize,
    idx_var: &str,
    max_var: &str,
) -> Result<()> {
    line(w, indent, &format!("uint8_t {} = 0;", idx_var))?;
    line(w, indent, &format!("uint8_t {} = votes[0];", max_var))?;
    line(w, 0, "")?;
    line(w, indent, &format!("for (uint8_t i = 1; i < {}; i++) {{", n_classes))?;
    line(w, indent + 1, &format!("if (votes[i] > {}) {{", max_var))?;
    line(w, indent + 2, &format!("{} = i;", idx_var))?;
    line(w, indent + 2, &format!("{} = votes[i];", max_var))?;
    line(w, indent + 1, "}")?;
    line(w, indent, "}")?;
    line(w, 0, "")
}

/// Escape a string for use inside a C string literal
fn escape_c(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '"' => vec!['\\', '"'],
            '\\' => vec!['\\', '\\'],
            '\n' => vec!['\\', 'n'],
            c if c.is_ascii() && !c.is_ascii_control() => vec![c],
            _ => vec!['?'],
        })
        .collect()
}

/// Reduce `s` to a valid C identifier
fn c_identifier(s: &str) -> String {
    let mut ident: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}
