use std::sync::Arc;

use crate::re::{
    backtrack::{self, Backtracker},
    error::Error,
    groups::{Captures, Span},
    pikevm::PikeVM,
    program::{self, Compiler, Prefilter, Program, Slot},
    syntax::{self, Flags},
};

/// The execution engine a [`Regex`] runs on.
///
/// Every engine reports the same matches and captures for the patterns it
/// accepts. They differ in how they get there.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Engine {
    /// Follow one path at a time and backtrack on failure. Supports every
    /// construct, but some patterns take exponential time.
    Backtrack,
    /// Advance every possible path in lockstep. Supports every construct.
    /// Runs in time linear in the haystack unless the pattern uses
    /// backreferences or lookarounds.
    Complex,
    /// Like `Complex`, but refuses patterns with capture groups,
    /// backreferences or conditionals.
    Simple,
}

impl Default for Engine {
    fn default() -> Engine {
        Engine::Backtrack
    }
}

/// The configuration used for building a [`Regex`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    engine: Option<Engine>,
    flags: Option<Flags>,
    size_limit: Option<usize>,
    fuse_literals: Option<bool>,
    lookaround_cache: Option<bool>,
    compress_stack: Option<bool>,
}

impl Config {
    /// Return a new default configuration.
    pub fn new() -> Config {
        Config::default()
    }

    /// Choose the engine. The default is [`Engine::Backtrack`].
    pub fn engine(mut self, engine: Engine) -> Config {
        self.engine = Some(engine);
        self
    }

    /// The flags in effect at the start of the pattern. Inline flags
    /// override them.
    pub fn flags(mut self, flags: Flags) -> Config {
        self.flags = Some(flags);
        self
    }

    /// The maximum number of operations in a compiled pattern. Counted
    /// repetitions are expanded, so `(a{100}){100}` needs over 10,000.
    ///
    /// The default is 100,000.
    pub fn size_limit(mut self, limit: usize) -> Config {
        self.size_limit = Some(limit);
        self
    }

    /// Whether runs of literal characters are matched as a single string.
    ///
    /// This is enabled by default for the backtracking engine and disabled
    /// for the others.
    pub fn fuse_literals(mut self, yes: bool) -> Config {
        self.fuse_literals = Some(yes);
        self
    }

    /// Whether the outcome of a lookaround that reads no capture groups is
    /// remembered per offset during a search. Enabled by default.
    pub fn lookaround_cache(mut self, yes: bool) -> Config {
        self.lookaround_cache = Some(yes);
        self
    }

    /// Whether the backtracking engine folds runs of equivalent stack
    /// entries together. Enabled by default.
    pub fn compress_stack(mut self, yes: bool) -> Config {
        self.compress_stack = Some(yes);
        self
    }

    /// Returns the engine that will run searches.
    pub fn get_engine(&self) -> Engine {
        self.engine.unwrap_or_default()
    }

    /// Returns the flags in effect at the start of the pattern.
    pub fn get_flags(&self) -> Flags {
        self.flags.unwrap_or_default()
    }

    /// Returns the maximum number of operations in a compiled pattern.
    pub fn get_size_limit(&self) -> usize {
        self.size_limit.unwrap_or(100_000)
    }

    /// Returns whether runs of literal characters are matched as a single
    /// string. When unset, this depends on the configured engine.
    pub fn get_fuse_literals(&self) -> bool {
        self.fuse_literals.unwrap_or(self.get_engine() == Engine::Backtrack)
    }

    /// Returns whether lookaround outcomes are remembered per offset.
    pub fn get_lookaround_cache(&self) -> bool {
        self.lookaround_cache.unwrap_or(true)
    }

    /// Returns whether the backtracking engine compresses its stack.
    pub fn get_compress_stack(&self) -> bool {
        self.compress_stack.unwrap_or(true)
    }

    pub(crate) fn overwrite(self, o: Config) -> Config {
        Config {
            engine: o.engine.or(self.engine),
            flags: o.flags.or(self.flags),
            size_limit: o.size_limit.or(self.size_limit),
            fuse_literals: o.fuse_literals.or(self.fuse_literals),
            lookaround_cache: o.lookaround_cache.or(self.lookaround_cache),
            compress_stack: o.compress_stack.or(self.compress_stack),
        }
    }
}

/// A builder for a [`Regex`].
#[derive(Clone, Debug, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Create a new builder with its default configuration.
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Apply the given configuration options to this builder.
    pub fn configure(&mut self, config: Config) -> &mut Builder {
        self.config = self.config.overwrite(config);
        self
    }

    /// Compile a pattern.
    pub fn build(&self, pattern: &str) -> Result<Regex, Error> {
        let parsed = syntax::parse(pattern, self.config.get_flags())?;
        let compiler = Compiler::new(
            self.config.get_fuse_literals(),
            self.config.get_size_limit(),
        );
        let program = Arc::new(compiler.compile(&parsed)?);
        let cache = self.config.get_lookaround_cache();
        let imp = match self.config.get_engine() {
            Engine::Backtrack => Imp::Backtrack(Backtracker::new(
                Arc::clone(&program),
                self.config.get_compress_stack(),
                cache,
            )),
            Engine::Complex => {
                Imp::PikeVM(PikeVM::new(Arc::clone(&program), false, cache)?)
            }
            Engine::Simple => {
                Imp::PikeVM(PikeVM::new(Arc::clone(&program), true, cache)?)
            }
        };
        debug!(
            "built {:?} regex for {:?} with {} ops",
            self.config.get_engine(),
            pattern,
            program.ops.len(),
        );
        Ok(Regex {
            pattern: pattern.into(),
            config: self.config,
            prefilter: Prefilter::new(&program.prefix),
            names: parsed.names.into(),
            program,
            imp,
        })
    }
}

#[derive(Clone, Debug)]
enum Imp {
    Backtrack(Backtracker),
    PikeVM(PikeVM),
}

/// A compiled regular expression.
///
/// Offsets are byte offsets into the haystack. Searches are leftmost-first:
/// the match reported is the one starting earliest, and among those, the one
/// a backtracking search trying alternatives in order would find first.
///
/// ```
/// use parse_automata::re::Regex;
///
/// let re = Regex::new(r"(?P<y>\d{4})-(?P<m>\d{2})")?;
/// let caps = re.captures("due 2024-03").unwrap();
/// assert_eq!(caps.get(0).map(|s| s.range()), Some(4..11));
/// assert_eq!(caps.name("m").map(|s| s.range()), Some(9..11));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct Regex {
    pattern: Arc<str>,
    config: Config,
    program: Arc<Program>,
    prefilter: Option<Prefilter>,
    names: Arc<[Option<String>]>,
    imp: Imp,
}

impl Regex {
    /// Compile a pattern with the default configuration.
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        Regex::builder().build(pattern)
    }

    /// Return a default configuration.
    pub fn config() -> Config {
        Config::new()
    }

    /// Return a builder for configuring the construction of a regex.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// The pattern this regex was compiled from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// The engine this regex runs on.
    pub fn engine(&self) -> Engine {
        self.config.get_engine()
    }

    /// The number of capture groups, including group 0.
    pub fn group_len(&self) -> usize {
        self.program.group_len
    }

    /// The name of each group in index order, `None` for unnamed groups.
    pub fn group_names(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.names.iter().map(|n| n.as_deref())
    }

    /// Returns true if the pattern matches anywhere in `haystack`.
    pub fn is_match(&self, haystack: &str) -> bool {
        self.find(haystack).is_some()
    }

    /// The leftmost match in `haystack`.
    pub fn find(&self, haystack: &str) -> Option<Span> {
        self.find_at(haystack, 0)
    }

    /// The leftmost match starting at or after `start`. Lookbehinds and
    /// anchors still see the text before `start`.
    pub fn find_at(&self, haystack: &str, start: usize) -> Option<Span> {
        self.captures_at(haystack, start).map(|caps| caps.get_match())
    }

    /// The match starting exactly at `start`, if any.
    pub fn match_at(&self, haystack: &str, start: usize) -> Option<Span> {
        if !haystack.is_char_boundary(start) {
            return None;
        }
        let slots = self.search(haystack, start, true)?;
        self.captures_from(slots).map(|caps| caps.get_match())
    }

    /// The capture groups of the leftmost match in `haystack`.
    pub fn captures(&self, haystack: &str) -> Option<Captures> {
        self.captures_at(haystack, 0)
    }

    /// The capture groups of the leftmost match starting at or after `start`.
    pub fn captures_at(&self, haystack: &str, start: usize) -> Option<Captures> {
        let mut start = start;
        while start <= haystack.len() && !haystack.is_char_boundary(start) {
            start += 1;
        }
        if start > haystack.len() {
            return None;
        }
        let slots = self.search(haystack, start, false)?;
        self.captures_from(slots)
    }

    /// Iterate over successive non-overlapping matches.
    ///
    /// An empty match right where the previous match ended is skipped.
    pub fn find_iter<'r, 't>(&'r self, haystack: &'t str) -> FindMatches<'r, 't> {
        FindMatches { re: self, haystack, last_end: 0, last_match: None }
    }

    fn captures_from(&self, slots: Vec<Slot>) -> Option<Captures> {
        Program::span(&slots, 0)?;
        Some(Captures::new(slots, Arc::clone(&self.names)))
    }

    fn search(&self, haystack: &str, start: usize, anchored: bool) -> Option<Vec<Slot>> {
        let prefilter = self.prefilter.as_ref();
        match self.imp {
            Imp::Backtrack(ref bt) => {
                let mut cache = backtrack::Cache::new();
                bt.search(&mut cache, haystack, start, anchored, prefilter)
                    .map(|groups| groups.as_slice().to_vec())
            }
            Imp::PikeVM(ref vm) => {
                let mut cache = vm.create_cache();
                vm.search(&mut cache, haystack, start, anchored, prefilter)
            }
        }
    }
}

/// An iterator over the non-overlapping matches of a [`Regex`].
///
/// `'r` is the lifetime of the regex and `'t` the lifetime of the haystack.
#[derive(Clone, Debug)]
pub struct FindMatches<'r, 't> {
    re: &'r Regex,
    haystack: &'t str,
    last_end: usize,
    last_match: Option<usize>,
}

impl<'r, 't> Iterator for FindMatches<'r, 't> {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        loop {
            if self.last_end > self.haystack.len() {
                return None;
            }
            let span = self.re.find_at(self.haystack, self.last_end)?;
            if span.is_empty() {
                self.last_end = program::next_boundary(self.haystack, span.end);
                if Some(span.end) == self.last_match {
                    continue;
                }
            } else {
                self.last_end = span.end;
            }
            self.last_match = Some(span.end);
            return Some(span);
        }
    }
}
