use std::collections::HashMap;
use std::fmt;

use crate::foundation::error::{ReelError, ReelResult};

/// A stream label inside a filter graph.
///
/// Input streams (`0:v`, `1:a`) are referenced directly; every other label must be produced by
/// exactly one chain before it is consumed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pad(String);

impl Pad {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Video stream of input file `index`.
    pub fn video(index: usize) -> Self {
        Self(format!("{index}:v"))
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    /// `true` for direct input stream references such as `0:v`.
    pub fn is_input_stream(&self) -> bool {
        self.0
            .split_once(':')
            .is_some_and(|(idx, _)| !idx.is_empty() && idx.bytes().all(|b| b.is_ascii_digit()))
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// One filter with ordered arguments, e.g. `xfade=transition=fade:duration=0.7`.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    name: String,
    args: Vec<(Option<String>, String)>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Positional argument.
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.args.push((None, value.to_string()));
        self
    }

    /// Named argument.
    pub fn kv(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.args.push((Some(key.into()), value.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of a named argument.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, (key, value)) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            match key {
                Some(k) => write!(f, "{k}={value}")?,
                None => f.write_str(value)?,
            }
        }
        Ok(())
    }
}

/// Linear chain `[in..]f1,f2,..[out..]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterChain {
    pub inputs: Vec<Pad>,
    pub filters: Vec<Filter>,
    pub outputs: Vec<Pad>,
}

impl FilterChain {
    pub fn new(inputs: impl IntoIterator<Item = Pad>) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            filters: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn then(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn to(mut self, outputs: impl IntoIterator<Item = Pad>) -> Self {
        self.outputs = outputs.into_iter().collect();
        self
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.inputs {
            write!(f, "{p}")?;
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        for p in &self.outputs {
            write!(f, "{p}")?;
        }
        Ok(())
    }
}

/// A complete `-filter_complex` graph. Serialized only when handed to ffmpeg.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterGraph {
    pub chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chain: FilterChain) -> &mut Self {
        self.chains.push(chain);
        self
    }

    pub fn with(mut self, chain: FilterChain) -> Self {
        self.chains.push(chain);
        self
    }

    /// Every filter in the graph, in order.
    pub fn filters(&self) -> impl Iterator<Item = &Filter> {
        self.chains.iter().flat_map(|c| c.filters.iter())
    }

    /// Labels produced but never consumed; these are what `-map` selects.
    pub fn terminal_outputs(&self) -> Vec<Pad> {
        let consumed: Vec<&Pad> = self.chains.iter().flat_map(|c| &c.inputs).collect();
        self.chains
            .iter()
            .flat_map(|c| &c.outputs)
            .filter(|p| !consumed.contains(p))
            .cloned()
            .collect()
    }

    /// Check that every label is produced exactly once and consumed at most once, and that
    /// nothing is consumed before it is produced.
    pub fn validate(&self) -> ReelResult<()> {
        if self.chains.is_empty() {
            return Err(ReelError::validation("filter graph is empty"));
        }
        let mut produced: HashMap<&str, bool> = HashMap::new();
        for chain in &self.chains {
            if chain.filters.is_empty() {
                return Err(ReelError::validation("filter chain has no filters"));
            }
            for pad in &chain.inputs {
                if pad.is_input_stream() {
                    continue;
                }
                match produced.get_mut(pad.label()) {
                    Some(used) if !*used => *used = true,
                    Some(_) => {
                        return Err(ReelError::validation(format!(
                            "filter pad {pad} consumed twice"
                        )));
                    }
                    None => {
                        return Err(ReelError::validation(format!(
                            "filter pad {pad} consumed before it is produced"
                        )));
                    }
                }
            }
            for pad in &chain.outputs {
                if produced.insert(pad.label(), false).is_some() {
                    return Err(ReelError::validation(format!(
                        "filter pad {pad} produced twice"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chain) in self.chains.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{chain}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/graph.rs"]
mod tests;
