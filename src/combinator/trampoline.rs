/*!
The trampoline: an explicit-stack evaluator for matcher graphs.

A [`Parser`] pairs a [`Grammar`] with a root matcher. Calling
[`Parser::matches`] returns a lazy iterator: each call to `next` resumes
exactly as much search as is needed to produce one more result (or to
discover there are none).

The evaluator keeps a stack of coroutine IDs. A frame that wants a child's
next result returns a request, and the child is pushed and resumed. A frame
that yields is popped and its result handed to the frame below it, or to
the caller when the stack is empty. Exhaustion travels down the stack the
same way. No frame ever calls another frame, so grammar depth never turns
into native stack depth.
*/

use std::borrow::Cow;

use crate::{
    combinator::{
        coroutine::{Coroutine, Coroutines, Frame, Resume, Sequence, Step},
        error::Error,
        grammar::Grammar,
        memo::MemoTables,
        resource::Resources,
        value::{Match, Value},
    },
    util::{
        primitives::{CoroutineID, MatcherID},
        stream::Stream,
    },
};

/// The configuration used for running a parser.
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    // For docs on the fields below, see the corresponding method setters.
    max_coroutines: Option<Option<usize>>,
    step_limit: Option<Option<u64>>,
    restart: Option<bool>,
}

impl Config {
    /// Return a new default parser configuration.
    pub fn new() -> Config {
        Config::default()
    }

    /// Set a budget on the number of simultaneously live coroutines.
    ///
    /// When exceeded, the least recently used coroutines not currently on
    /// the evaluation stack are closed. Alternatives they would have
    /// produced are lost, so a budget trades completeness for memory.
    ///
    /// By default there is no budget.
    pub fn max_coroutines(mut self, limit: Option<usize>) -> Config {
        self.max_coroutines = Some(limit);
        self
    }

    /// Set a bound on the number of trampoline steps a single run may take
    /// before failing with
    /// [`ErrorKind::StepLimitExceeded`](crate::combinator::ErrorKind::StepLimitExceeded).
    ///
    /// By default there is no bound.
    pub fn step_limit(mut self, limit: Option<u64>) -> Config {
        self.step_limit = Some(limit);
        self
    }

    /// Whether pulling from a [`Matches`] iterator after it reported
    /// exhaustion restarts the search from the root.
    ///
    /// This is enabled by default.
    pub fn restart(mut self, yes: bool) -> Config {
        self.restart = Some(yes);
        self
    }

    /// Returns the coroutine budget, if one is set.
    pub fn get_max_coroutines(&self) -> Option<usize> {
        self.max_coroutines.unwrap_or(None)
    }

    /// Returns the step bound, if one is set.
    pub fn get_step_limit(&self) -> Option<u64> {
        self.step_limit.unwrap_or(None)
    }

    /// Returns whether exhausted searches restart.
    pub fn get_restart(&self) -> bool {
        self.restart.unwrap_or(true)
    }

    /// Overwrite the default configuration such that the options in `o` are
    /// always used. If an option in `o` is not set, then the corresponding
    /// option in `self` is used. If it's not set in `self` either, then it
    /// remains not set.
    pub(crate) fn overwrite(self, o: Config) -> Config {
        Config {
            max_coroutines: o.max_coroutines.or(self.max_coroutines),
            step_limit: o.step_limit.or(self.step_limit),
            restart: o.restart.or(self.restart),
        }
    }
}

/// A builder for a [`Parser`].
#[derive(Clone, Debug, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Create a new parser builder with its default configuration.
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Apply the given configuration options to this builder.
    pub fn configure(&mut self, config: Config) -> &mut Builder {
        self.config = self.config.overwrite(config);
        self
    }

    /// Build a parser running `root` from `grammar`.
    ///
    /// `Delayed` matchers are not required to be bound yet. Invoking an
    /// unbound one fails the run that invokes it.
    pub fn build<'g>(
        &self,
        grammar: &'g Grammar,
        root: MatcherID,
    ) -> Result<Parser<'g>, Error> {
        grammar.get(root)?;
        Ok(Parser { grammar, root, config: self.config })
    }
}

/// A matcher graph ready to run against streams.
#[derive(Clone, Debug)]
pub struct Parser<'g> {
    grammar: &'g Grammar,
    root: MatcherID,
    config: Config,
}

impl<'g> Parser<'g> {
    /// Create a parser with the default configuration.
    pub fn new(grammar: &'g Grammar, root: MatcherID) -> Result<Parser<'g>, Error> {
        Builder::new().build(grammar, root)
    }

    /// Return a builder for configuring a parser.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Returns the configuration of this parser.
    pub fn get_config(&self) -> &Config {
        &self.config
    }

    /// Returns every alternative of the root matcher at `stream`, lazily, in
    /// search order.
    pub fn matches<S: Stream>(&self, stream: S) -> Matches<'g, S> {
        Matches {
            grammar: self.grammar,
            root: self.root,
            config: self.config,
            stream,
            ctx: Context::new(self.grammar, self.config),
            root_cid: None,
            finished: false,
        }
    }

    /// Returns the values of the first alternative, if any.
    pub fn parse<S: Stream>(&self, stream: S) -> Result<Option<Vec<Value>>, Error> {
        match self.matches(stream).next() {
            None => Ok(None),
            Some(result) => result.map(|m| Some(m.values)),
        }
    }

    /// Returns every alternative, in search order.
    pub fn parse_all<S: Stream>(&self, stream: S) -> Result<Vec<Match<S>>, Error> {
        let mut matches = self.matches(stream);
        let mut all = vec![];
        loop {
            match matches.next_result()? {
                None => return Ok(all),
                Some(m) => all.push(m),
            }
        }
    }

    /// Returns the values of the first alternative that consumes the whole
    /// stream.
    pub fn parse_complete<S: Stream>(
        &self,
        stream: S,
    ) -> Result<Option<Vec<Value>>, Error> {
        let mut matches = self.matches(stream);
        loop {
            match matches.next_result()? {
                None => return Ok(None),
                Some(m) if m.rest.is_empty() => return Ok(Some(m.values)),
                Some(_) => {}
            }
        }
    }
}

/// Counters describing the work done by a run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    steps: u64,
    spawned: u64,
    evicted: u64,
    max_depth: usize,
}

impl Stats {
    /// The number of trampoline steps taken.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The number of coroutines created.
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// The number of coroutines closed by the resource budget.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// The deepest the evaluation stack has been.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

/// A lazy sequence of the alternatives of a parser's root matcher.
///
/// The `'g` lifetime refers to the grammar being run, and `S` is the stream
/// type. When the search is exhausted `next` returns `None`. Calling it
/// again (when the parser is configured to restart, the default) starts a
/// new search from the root at the same position.
#[derive(Debug)]
pub struct Matches<'g, S> {
    grammar: &'g Grammar,
    root: MatcherID,
    config: Config,
    stream: S,
    ctx: Context<'g, S>,
    root_cid: Option<CoroutineID>,
    finished: bool,
}

impl<'g, S: Stream> Matches<'g, S> {
    /// Counters for the current run (reset by a restart).
    pub fn stats(&self) -> Stats {
        self.ctx.stats
    }

    /// Like `next`, but with the result and option transposed. Never
    /// restarts.
    fn next_result(&mut self) -> Result<Option<Match<S>>, Error> {
        if self.finished {
            return Ok(None);
        }
        self.next().transpose()
    }

    fn restart(&mut self) {
        trace!(
            "restarting search from matcher {} at {}",
            self.root,
            self.stream.describe(0),
        );
        self.ctx = Context::new(self.grammar, self.config);
        self.root_cid = None;
        self.finished = false;
    }
}

impl<'g, S: Stream> Iterator for Matches<'g, S> {
    type Item = Result<Match<S>, Error>;

    fn next(&mut self) -> Option<Result<Match<S>, Error>> {
        if self.finished {
            if !self.config.get_restart() {
                return None;
            }
            self.restart();
        }
        let root = match self.root_cid {
            Some(cid) => cid,
            None => match self.ctx.spawn(self.root, self.stream.clone()) {
                Ok(cid) => {
                    self.root_cid = Some(cid);
                    cid
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            },
        };
        match self.ctx.drive(root) {
            Ok(Some(m)) => Some(Ok(m)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

/// The state of one run: the coroutine arena, the evaluation stack, memo
/// tables and the resource budget.
#[derive(Debug)]
pub(crate) struct Context<'g, S> {
    grammar: &'g Grammar,
    step_limit: Option<u64>,
    coroutines: Coroutines<'g, S>,
    stack: Vec<CoroutineID>,
    pub(crate) memo: MemoTables<S>,
    resources: Resources,
    stats: Stats,
}

impl<'g, S: Stream> Context<'g, S> {
    fn new(grammar: &'g Grammar, config: Config) -> Context<'g, S> {
        Context {
            grammar,
            step_limit: config.get_step_limit(),
            coroutines: Coroutines::new(),
            stack: vec![],
            memo: MemoTables::new(),
            resources: Resources::new(config.get_max_coroutines()),
            stats: Stats::default(),
        }
    }

    /// Create a coroutine invoking `id` at `at`.
    pub(crate) fn spawn(
        &mut self,
        id: MatcherID,
        at: S,
    ) -> Result<CoroutineID, Error> {
        let grammar = self.grammar;
        let id = grammar.resolve(id)?;
        let frame = Frame::new(id, &grammar[id], &at);
        self.insert(id, at, frame)
    }

    /// Create a coroutine for an anonymous sequence of matchers.
    pub(crate) fn spawn_sequence(
        &mut self,
        children: Cow<'g, [MatcherID]>,
        at: S,
    ) -> Result<CoroutineID, Error> {
        let id = children.last().copied().unwrap_or(MatcherID::ZERO);
        self.insert(id, at, Frame::Sequence(Sequence::new(children)))
    }

    fn insert(
        &mut self,
        matcher: MatcherID,
        stream: S,
        frame: Frame<'g, S>,
    ) -> Result<CoroutineID, Error> {
        let co = Coroutine {
            matcher,
            stream,
            frame,
            active: false,
            committed: false,
            epoch: 0,
        };
        let cid = self.coroutines.insert(co)?;
        let epoch = self.resources.touch(cid);
        if let Some(co) = self.coroutines.get_mut(cid) {
            co.epoch = epoch;
        }
        self.stats.spawned += 1;
        while self.resources.over(self.coroutines.len()) {
            match self.resources.victim(&self.coroutines, cid) {
                None => break,
                Some(victim) => {
                    trace!("evicting coroutine {}", victim);
                    self.stats.evicted += 1;
                    self.close(victim);
                }
            }
        }
        Ok(cid)
    }

    /// Close a coroutine and, recursively, every coroutine it owns.
    /// Closing a coroutine that is already gone does nothing.
    pub(crate) fn close(&mut self, cid: CoroutineID) {
        let mut pending = vec![cid];
        while let Some(cid) = pending.pop() {
            if self.coroutines.get(cid).map_or(true, |co| co.active) {
                continue;
            }
            if let Some(co) = self.coroutines.remove(cid) {
                pending.extend(co.frame.children());
            }
        }
    }

    /// Cut: every coroutine on the stack loses its remaining alternatives,
    /// and every suspended coroutine off the stack is closed.
    pub(crate) fn commit(&mut self) {
        for &cid in self.stack.iter() {
            if let Some(co) = self.coroutines.get_mut(cid) {
                co.committed = true;
                co.frame.cut();
            }
        }
        let inactive: Vec<CoroutineID> = self
            .coroutines
            .iter()
            .filter(|&(_, co)| !co.active)
            .map(|(cid, _)| cid)
            .collect();
        debug!(
            "commit with {} coroutines on the stack, closing {} others",
            self.stack.len(),
            inactive.len(),
        );
        for cid in inactive {
            self.close(cid);
        }
    }

    /// Push `cid` if it may produce more results.
    fn admit(&mut self, cid: CoroutineID) -> bool {
        let committed = match self.coroutines.get_mut(cid) {
            None => return false,
            Some(co) => {
                if !co.committed {
                    co.active = true;
                }
                co.committed
            }
        };
        if committed {
            self.close(cid);
            return false;
        }
        self.stack.push(cid);
        if self.stack.len() > self.stats.max_depth {
            self.stats.max_depth = self.stack.len();
        }
        true
    }

    /// Pop the top of the stack.
    fn pop(&mut self) -> Option<CoroutineID> {
        let cid = self.stack.pop()?;
        if let Some(co) = self.coroutines.get_mut(cid) {
            co.active = false;
        }
        Some(cid)
    }

    fn resume(
        &mut self,
        cid: CoroutineID,
        input: Resume<S>,
    ) -> Result<Step<S>, Error> {
        self.stats.steps += 1;
        if let Some(limit) = self.step_limit {
            if self.stats.steps > limit {
                return Err(Error::step_limit_exceeded(limit));
            }
        }
        let mut co = match self.coroutines.take(cid) {
            None => return Ok(Step::Exhausted),
            Some(co) => co,
        };
        co.epoch = self.resources.touch(cid);
        let result = co.frame.resume(self, &co.stream, input);
        if let Err(ref _err) = result {
            error!(
                "parse aborted in {} matcher {} invoked at {}: {}",
                self.grammar[co.matcher].name(),
                co.matcher,
                co.stream.describe(0),
                _err,
            );
        }
        self.coroutines.restore(cid, co);
        result
    }

    /// Run until `root` yields a result (`Some`) or is exhausted (`None`).
    fn drive(&mut self, root: CoroutineID) -> Result<Option<Match<S>>, Error> {
        let mut step = Step::Request(root);
        loop {
            step = match step {
                Step::Request(cid) => {
                    if self.admit(cid) {
                        self.resume(cid, Resume::Next)?
                    } else {
                        match self.stack.last() {
                            None => return Ok(None),
                            Some(&top) => self.resume(top, Resume::Exhausted)?,
                        }
                    }
                }
                Step::Yield(m) => {
                    self.pop();
                    match self.stack.last() {
                        None => return Ok(Some(m)),
                        Some(&top) => self.resume(top, Resume::Value(m))?,
                    }
                }
                Step::Exhausted => {
                    if let Some(cid) = self.pop() {
                        self.close(cid);
                    }
                    match self.stack.last() {
                        None => return Ok(None),
                        Some(&top) => self.resume(top, Resume::Exhausted)?,
                    }
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        combinator::{ErrorKind, MemoKind, Order},
        util::{interval::IntervalSet, stream::Text},
    };

    use super::*;

    fn texts(matches: &[Match<Text>]) -> Vec<String> {
        matches.iter().map(Match::text).collect()
    }

    #[test]
    fn alternation_order() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let ab = g.literal("ab").unwrap();
        let alt = g.alternation(&[a, ab]).unwrap();
        let parser = Parser::new(&g, alt).unwrap();
        let all = parser.parse_all(Text::new("abc")).unwrap();
        assert_eq!(texts(&all), vec!["a", "ab"]);
        assert_eq!(all[0].rest.rest(), "bc");
        assert_eq!(all[1].rest.rest(), "c");
    }

    #[test]
    fn sequence_backtracks_into_earlier_children() {
        // ('a' | 'ab') 'c' on "abc" needs the second alternative.
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let ab = g.literal("ab").unwrap();
        let c = g.literal("c").unwrap();
        let alt = g.alternation(&[a, ab]).unwrap();
        let seq = g.sequence(&[alt, c]).unwrap();
        let parser = Parser::new(&g, seq).unwrap();
        let all = parser.parse_all(Text::new("abc")).unwrap();
        assert_eq!(texts(&all), vec!["abc"]);
        assert!(all[0].rest.is_empty());
    }

    #[test]
    fn repetition_orders() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let greedy = g.repeat(a, 1, Some(2), Order::DepthFirst).unwrap();
        let lazy = g.repeat(a, 1, Some(2), Order::BreadthFirst).unwrap();

        let got = Parser::new(&g, greedy).unwrap().parse_all(Text::new("aaa"));
        assert_eq!(texts(&got.unwrap()), vec!["aa", "a"]);
        let got = Parser::new(&g, lazy).unwrap().parse_all(Text::new("aaa"));
        assert_eq!(texts(&got.unwrap()), vec!["a", "aa"]);
    }

    #[test]
    fn unbounded_repetition_of_empty_terminates() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let opt = g.repeat(a, 0, Some(1), Order::DepthFirst).unwrap();
        let star = g.repeat(opt, 0, None, Order::DepthFirst).unwrap();
        let all = Parser::new(&g, star).unwrap().parse_all(Text::new("aa"));
        let lens: Vec<usize> =
            all.unwrap().iter().map(|m| 2 - m.rest.len()).collect();
        assert_eq!(lens, vec![2, 1, 0]);
    }

    #[test]
    fn separated_repetition() {
        let mut g = Grammar::new();
        let digit = g.any_of(IntervalSet::range('0', '9')).unwrap();
        let comma = g.literal(",").unwrap();
        let list = g
            .separated(digit, comma, 1, None, Order::DepthFirst)
            .unwrap();
        let parser = Parser::new(&g, list).unwrap();
        let all = parser.parse_all(Text::new("1,2,3,")).unwrap();
        assert_eq!(texts(&all), vec!["1,2,3", "1,2", "1"]);
    }

    #[test]
    fn lookahead_does_not_consume() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let peek = g.lookahead(a).unwrap();
        let not = g.not(a).unwrap();
        let parser = Parser::new(&g, peek).unwrap();
        let all = parser.parse_all(Text::new("ab")).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].rest.len(), 2);
        assert!(all[0].values.is_empty());

        let parser = Parser::new(&g, not).unwrap();
        assert!(parser.parse_all(Text::new("ab")).unwrap().is_empty());
        assert_eq!(parser.parse_all(Text::new("b")).unwrap().len(), 1);
    }

    #[test]
    fn unbound_delayed_fails_the_run() {
        let mut g = Grammar::new();
        let d = g.delayed().unwrap();
        let parser = Parser::new(&g, d).unwrap();
        let err = parser.parse(Text::new("x")).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Unbound { matcher: d });
    }

    #[test]
    fn transform_rejects_alternatives() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let star = g.repeat(a, 0, None, Order::DepthFirst).unwrap();
        let even = g
            .transform(
                star,
                crate::combinator::Transform::new(|values| {
                    if values.len() % 2 == 0 {
                        Some(vec![Value::Int(values.len() as i64)])
                    } else {
                        None
                    }
                }),
            )
            .unwrap();
        let parser = Parser::new(&g, even).unwrap();
        let all = parser.parse_all(Text::new("aaa")).unwrap();
        let got: Vec<i64> =
            all.iter().map(|m| m.values[0].as_int().unwrap()).collect();
        assert_eq!(got, vec![2, 0]);
    }

    #[test]
    fn commit_cuts_earlier_alternatives() {
        // ('a' commit | 'a') 'b' on "ac": after the commit no second attempt.
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let b = g.literal("b").unwrap();
        let cut = g.commit().unwrap();
        let first = g.sequence(&[a, cut]).unwrap();
        let alt = g.alternation(&[first, a]).unwrap();
        let seq = g.sequence(&[alt, b]).unwrap();
        let parser = Parser::new(&g, seq).unwrap();
        assert!(parser.parse_all(Text::new("ac")).unwrap().is_empty());

        // Without the cut, the second alternative is still tried.
        let loose = g.alternation(&[a, a]).unwrap();
        let seq = g.sequence(&[loose, b]).unwrap();
        let parser = Parser::new(&g, seq).unwrap();
        let mut matches = parser.matches(Text::new("ab"));
        assert!(matches.next().unwrap().is_ok());
        assert!(matches.next().unwrap().is_ok());
        assert!(matches.next().is_none());
    }

    #[test]
    fn commit_is_not_undone_by_memoized_results() {
        // m := memo('a' | 'ab')
        // x := m commit 'x' | m 'bc'
        // The commit inside the first alternative of x rules out the second,
        // even though m already has "a" cached for it to replay.
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let ab = g.literal("ab").unwrap();
        let alt = g.alternation(&[a, ab]).unwrap();
        let m = g.memoize(alt, MemoKind::Right).unwrap();
        let cut = g.commit().unwrap();
        let x = g.literal("x").unwrap();
        let bc = g.literal("bc").unwrap();
        let first = g.sequence(&[m, cut, x]).unwrap();
        let second = g.sequence(&[m, bc]).unwrap();
        let committed = g.alternation(&[first, second]).unwrap();
        let parser = Parser::new(&g, committed).unwrap();
        assert!(parser.parse_all(Text::new("abc")).unwrap().is_empty());

        let first = g.sequence(&[m, x]).unwrap();
        let loose = g.alternation(&[first, second]).unwrap();
        let parser = Parser::new(&g, loose).unwrap();
        let all = parser.parse_all(Text::new("abc")).unwrap();
        assert_eq!(texts(&all), vec!["abc"]);
    }

    #[test]
    fn commit_inside_repetition_drops_shorter_counts() {
        // ('a' commit 'b')* on "abac": the second 'a' commits, so the
        // repetition cannot fall back to one or zero iterations.
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let b = g.literal("b").unwrap();
        let cut = g.commit().unwrap();
        let body = g.sequence(&[a, cut, b]).unwrap();
        let star = g.repeat(body, 0, None, Order::DepthFirst).unwrap();
        let parser = Parser::new(&g, star).unwrap();
        assert!(parser.parse_all(Text::new("abac")).unwrap().is_empty());
        let all = parser.parse_all(Text::new("abab")).unwrap();
        assert_eq!(texts(&all), vec!["abab"]);

        let body = g.sequence(&[a, b]).unwrap();
        let star = g.repeat(body, 0, None, Order::DepthFirst).unwrap();
        let parser = Parser::new(&g, star).unwrap();
        let all = parser.parse_all(Text::new("abac")).unwrap();
        assert_eq!(texts(&all), vec!["ab", ""]);
    }

    #[test]
    fn exhausted_iterator_restarts() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let parser = Parser::new(&g, a).unwrap();
        let mut matches = parser.matches(Text::new("a"));
        assert!(matches.next().is_some());
        assert!(matches.next().is_none());
        assert_eq!(matches.next().unwrap().unwrap().text(), "a");

        let parser = Parser::builder()
            .configure(Config::new().restart(false))
            .build(&g, a)
            .unwrap();
        let mut matches = parser.matches(Text::new("a"));
        assert!(matches.next().is_some());
        assert!(matches.next().is_none());
        assert!(matches.next().is_none());
    }

    #[test]
    fn right_memo_detects_left_recursion() {
        // e := e 'a' | 'a', with a right memo on e.
        let mut g = Grammar::new();
        let e = g.delayed().unwrap();
        let a = g.literal("a").unwrap();
        let rec = g.sequence(&[e, a]).unwrap();
        let body = g.alternation(&[rec, a]).unwrap();
        let memo = g.memoize(body, MemoKind::Right).unwrap();
        g.bind(e, memo).unwrap();
        let parser = Parser::new(&g, e).unwrap();
        let err = parser.parse(Text::new("aa")).unwrap_err();
        assert!(err.is_left_recursion());
    }

    #[test]
    fn left_memo_parses_left_recursion() {
        // e := e '+' '1' | '1'
        let mut g = Grammar::new();
        let e = g.delayed().unwrap();
        let plus = g.literal("+").unwrap();
        let one = g.literal("1").unwrap();
        let rec = g.sequence(&[e, plus, one]).unwrap();
        let body = g.alternation(&[rec, one]).unwrap();
        let memo = g.memoize(body, MemoKind::Left).unwrap();
        g.bind(e, memo).unwrap();
        let parser = Parser::builder()
            .configure(Config::new().step_limit(Some(100_000)))
            .build(&g, e)
            .unwrap();
        let values = parser.parse_complete(Text::new("1+1+1")).unwrap().unwrap();
        let text: String =
            values.iter().filter_map(Value::as_text).collect();
        assert_eq!(text, "1+1+1");

        let all = parser.parse_all(Text::new("1+1+1")).unwrap();
        let mut lens: Vec<usize> = all.iter().map(|m| 5 - m.rest.len()).collect();
        lens.sort();
        lens.dedup();
        assert_eq!(lens, vec![1, 3, 5]);
    }

    #[test]
    fn right_memo_shares_underlying_computation() {
        // x := m 'b' | m 'c', where m := memo('a'*).
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let star = g.repeat(a, 0, None, Order::DepthFirst).unwrap();
        let m = g.memoize(star, MemoKind::Right).unwrap();
        let b = g.literal("b").unwrap();
        let c = g.literal("c").unwrap();
        let mb = g.sequence(&[m, b]).unwrap();
        let mc = g.sequence(&[m, c]).unwrap();
        let x = g.alternation(&[mb, mc]).unwrap();
        let parser = Parser::new(&g, x).unwrap();
        let all = parser.parse_all(Text::new("aaac")).unwrap();
        assert_eq!(texts(&all), vec!["aaac"]);

        let mut matches = parser.matches(Text::new("aaac"));
        assert!(matches.next().is_some());
        let memoized = matches.stats().spawned();

        let mut plain = Grammar::new();
        let a = plain.literal("a").unwrap();
        let star = plain.repeat(a, 0, None, Order::DepthFirst).unwrap();
        let b = plain.literal("b").unwrap();
        let c = plain.literal("c").unwrap();
        let sb = plain.sequence(&[star, b]).unwrap();
        let sc = plain.sequence(&[star, c]).unwrap();
        let x = plain.alternation(&[sb, sc]).unwrap();
        let parser = Parser::new(&plain, x).unwrap();
        let mut matches = parser.matches(Text::new("aaac"));
        assert!(matches.next().is_some());
        assert!(memoized < matches.stats().spawned());
    }

    #[test]
    fn step_limit_is_enforced() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let star = g.repeat(a, 0, None, Order::DepthFirst).unwrap();
        let parser = Parser::builder()
            .configure(Config::new().step_limit(Some(3)))
            .build(&g, star)
            .unwrap();
        let err = parser.parse(Text::new("aaaaaa")).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::StepLimitExceeded { limit: 3 });
    }

    #[test]
    fn coroutine_budget_evicts() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let star = g.repeat(a, 0, None, Order::DepthFirst).unwrap();
        let parser = Parser::builder()
            .configure(Config::new().max_coroutines(Some(2)))
            .build(&g, star)
            .unwrap();
        let mut matches = parser.matches(Text::new("aaaa"));
        let first = matches.next().unwrap().unwrap();
        assert_eq!(first.text(), "aaaa");
        assert!(matches.stats().evicted() > 0);
    }

    fn budgeted(g: &Grammar, limit: usize) -> Context<'_, Text> {
        Context::new(g, Config::new().max_coroutines(Some(limit)))
    }

    #[test]
    fn eviction_spares_coroutines_on_the_stack() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let mut ctx = budgeted(&g, 2);
        let first = ctx.spawn(a, Text::new("a")).unwrap();
        let second = ctx.spawn(a, Text::new("a")).unwrap();
        assert!(ctx.admit(first));

        // `first` is older, but it is on the stack.
        let third = ctx.spawn(a, Text::new("a")).unwrap();
        assert!(ctx.coroutines.get(first).is_some());
        assert!(ctx.coroutines.get(second).is_none());
        assert!(ctx.coroutines.get(third).is_some());
        assert_eq!(ctx.stats.evicted(), 1);
        assert!(!ctx.resources.warned());
    }

    #[test]
    fn eviction_picks_least_recently_resumed() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let mut ctx = budgeted(&g, 3);
        let first = ctx.spawn(a, Text::new("a")).unwrap();
        let second = ctx.spawn(a, Text::new("a")).unwrap();
        let third = ctx.spawn(a, Text::new("a")).unwrap();
        assert!(matches!(ctx.resume(first, Resume::Next), Ok(Step::Yield(_))));

        let fourth = ctx.spawn(a, Text::new("a")).unwrap();
        assert!(ctx.coroutines.get(second).is_none());
        for &cid in &[first, third, fourth] {
            assert!(ctx.coroutines.get(cid).is_some());
        }
        assert_eq!(ctx.stats.evicted(), 1);
    }

    #[test]
    fn budget_is_exceeded_when_every_candidate_is_active() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let mut ctx = budgeted(&g, 1);
        let first = ctx.spawn(a, Text::new("a")).unwrap();
        assert!(ctx.admit(first));
        let second = ctx.spawn(a, Text::new("a")).unwrap();
        assert!(ctx.coroutines.get(first).is_some());
        assert!(ctx.coroutines.get(second).is_some());
        assert_eq!(ctx.coroutines.len(), 2);
        assert_eq!(ctx.stats.evicted(), 0);
        assert!(ctx.resources.warned());
    }

    #[test]
    fn empty_and_nested_sequences() {
        let mut g = Grammar::new();
        let a = g.literal("a").unwrap();
        let b = g.literal("b").unwrap();
        let empty = g.sequence(&[]).unwrap();
        let inner = g.sequence(&[a, empty, b]).unwrap();
        let outer = g.sequence(&[inner, inner]).unwrap();
        let parser = Parser::new(&g, outer).unwrap();
        let all = parser.parse_all(Text::new("abab!")).unwrap();
        assert_eq!(texts(&all), vec!["abab"]);
        assert_eq!(all[0].rest.rest(), "!");

        let parser = Parser::new(&g, empty).unwrap();
        let all = parser.parse_all(Text::new("a")).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].values.is_empty());
        assert_eq!(all[0].rest.len(), 1);
    }

    #[test]
    fn deep_nesting_uses_explicit_stack() {
        // A right recursive list 10,000 deep would overflow a native
        // recursive evaluator.
        let mut g = Grammar::new();
        let list = g.delayed().unwrap();
        let a = g.literal("a").unwrap();
        let more = g.sequence(&[a, list]).unwrap();
        let end = g.end().unwrap();
        let body = g.alternation(&[more, end]).unwrap();
        g.bind(list, body).unwrap();
        let input = "a".repeat(10_000);
        let parser = Parser::new(&g, list).unwrap();
        let mut matches = parser.matches(Text::new(&input));
        let m = matches.next().unwrap().unwrap();
        assert_eq!(m.values.len(), 10_000);
        assert!(matches.stats().max_depth() > 10_000);
    }
}
