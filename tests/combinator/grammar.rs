use parse_automata::{
    automaton::Automaton,
    combinator::{
        Config, ErrorKind, Grammar, MemoKind, Order, Parser, Transform, Value,
    },
    util::{
        interval::IntervalSet,
        stream::{Stream, Text},
    },
};

use crate::Result;

fn int(values: &[Value], i: usize) -> i64 {
    values.get(i).and_then(Value::as_int).unwrap_or(0)
}

// expr := expr ('+' | '-') digit | digit, evaluated as it is parsed.
#[test]
fn left_recursive_arithmetic() -> Result<()> {
    let mut g = Grammar::new();
    let expr = g.delayed()?;
    let digit = g.any_of(IntervalSet::range('0', '9'))?;
    let number = g.transform(
        digit,
        Transform::map(|v| {
            let n = v[0].as_text().and_then(|t| t.parse().ok());
            Value::Int(n.unwrap_or(0))
        }),
    )?;
    let plus = g.literal("+")?;
    let minus = g.literal("-")?;
    let op = g.alternation(&[plus, minus])?;
    let rec = g.sequence(&[expr, op, number])?;
    let apply = g.transform(
        rec,
        Transform::map(|v| match v[1].as_text() {
            Some("-") => Value::Int(int(v, 0) - int(v, 2)),
            _ => Value::Int(int(v, 0) + int(v, 2)),
        }),
    )?;
    let body = g.alternation(&[apply, number])?;
    let memo = g.memoize(body, MemoKind::Left)?;
    g.bind(expr, memo)?;

    let parser = Parser::new(&g, expr)?;
    let got = parser.parse_complete(Text::new("1+2+3"))?;
    assert_eq!(got, Some(vec![Value::Int(6)]));
    // Left associative: (9-3)-2, not 9-(3-2).
    let got = parser.parse_complete(Text::new("9-3-2"))?;
    assert_eq!(got, Some(vec![Value::Int(4)]));
    assert_eq!(parser.parse_complete(Text::new("1+"))?, None);

    // Every prefix that is an expression is an alternative.
    let all = parser.parse_all(Text::new("1+2+3"))?;
    let mut rests: Vec<usize> = all.iter().map(|m| m.rest.len()).collect();
    rests.sort();
    rests.dedup();
    assert_eq!(rests, vec![0, 2, 4]);
    Ok(())
}

#[test]
fn right_memo_reports_left_recursion() -> Result<()> {
    let mut g = Grammar::new();
    let expr = g.delayed()?;
    let digit = g.any_of(IntervalSet::range('0', '9'))?;
    let plus = g.literal("+")?;
    let rec = g.sequence(&[expr, plus, digit])?;
    let body = g.alternation(&[rec, digit])?;
    let memo = g.memoize(body, MemoKind::Right)?;
    g.bind(expr, memo)?;

    let parser = Parser::new(&g, expr)?;
    let err = parser.parse(Text::new("1+2")).unwrap_err();
    assert!(err.is_left_recursion());
    Ok(())
}

#[test]
fn right_memo_shares_work() -> Result<()> {
    // (word ' ')? word, where both branches start with the same word.
    let mut g = Grammar::new();
    let letters = g.any_of(IntervalSet::range('a', 'z'))?;
    let word = g.repeat(letters, 1, None, Order::DepthFirst)?;
    let memo = g.memoize(word, MemoKind::Right)?;
    let space = g.literal(" ")?;
    let pair = g.sequence(&[memo, space, memo])?;
    let end = g.end()?;
    let one = g.sequence(&[memo, end])?;
    let two = g.sequence(&[pair, end])?;
    let root = g.alternation(&[one, two])?;

    let parser = Parser::new(&g, root)?;
    let all = parser.parse_all(Text::new("ab cd"))?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].text(), "ab cd");
    assert_eq!(parser.parse_all(Text::new("ab"))?.len(), 1);
    Ok(())
}

#[test]
fn token_automata_in_a_list() -> Result<()> {
    for automaton in vec![Automaton::nfa("[a-z]+")?, Automaton::dfa("[a-z]+")?]
    {
        let mut g = Grammar::new();
        let word = g.regex(automaton)?;
        let space = g.literal(" ")?;
        let list = g.separated(word, space, 1, None, Order::DepthFirst)?;
        let end = g.end()?;
        let root = g.sequence(&[list, end])?;

        let parser = Parser::new(&g, root)?;
        let all = parser.parse_all(Text::new("ab cd"))?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text(), "ab cd");
        assert_eq!(all[0].values.len(), 3);
        assert!(parser.parse_all(Text::new("ab  cd"))?.is_empty());
    }
    Ok(())
}

#[test]
fn nfa_tokens_backtrack_dfa_tokens_do_not() -> Result<()> {
    let run = |automaton: Automaton| -> Result<usize> {
        let mut g = Grammar::new();
        let tokens = g.regex(automaton)?;
        let tail = g.literal("ab")?;
        let root = g.sequence(&[tokens, tail])?;
        let parser = Parser::new(&g, root)?;
        let found = parser.parse_all(Text::new("aab"))?;
        Ok(found.len())
    };
    // The NFA also offers "a", which leaves "ab" for the literal.
    assert_eq!(run(Automaton::nfa("a+")?)?, 1);
    assert_eq!(run(Automaton::dfa("a+")?)?, 0);
    Ok(())
}

#[test]
fn walk_and_clone_a_cycle() -> Result<()> {
    // expr := 'a' | '(' expr ')'
    let mut g = Grammar::new();
    let expr = g.delayed()?;
    let a = g.literal("a")?;
    let open = g.literal("(")?;
    let close = g.literal(")")?;
    let paren = g.sequence(&[open, expr, close])?;
    let body = g.alternation(&[a, paren])?;
    g.bind(expr, body)?;

    let order = g.walk(expr)?;
    assert_eq!(order.len(), 6);
    assert_eq!(order.last(), Some(&expr));
    assert_eq!(g.resolve(expr)?, body);

    let copy = g.clone_subgraph(expr)?;
    assert_eq!(g.len(), 12);
    assert_ne!(copy, expr);
    let copied = g.walk(copy)?;
    assert_eq!(copied.len(), 6);
    assert!(copied.iter().all(|id| id.as_usize() >= 6));

    let parser = Parser::new(&g, copy)?;
    assert!(parser.parse_complete(Text::new("((a))"))?.is_some());
    assert!(parser.parse_complete(Text::new("((a)"))?.is_none());
    Ok(())
}

#[test]
fn bind_errors() -> Result<()> {
    let mut g = Grammar::new();
    let d = g.delayed()?;
    let a = g.literal("a")?;
    g.bind(d, a)?;
    let err = g.bind(d, a).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::AlreadyBound { matcher: d });
    let err = g.bind(a, a).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NotDelayed { matcher: a });
    let err = g.invert(a).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NotLookahead { matcher: a });

    let x = g.delayed()?;
    let y = g.delayed()?;
    g.bind(x, y)?;
    g.bind(y, x)?;
    let err = g.resolve(x).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DelayedCycle { matcher: x });
    Ok(())
}

#[test]
fn inverted_lookahead() -> Result<()> {
    let mut g = Grammar::new();
    let a = g.literal("a")?;
    let peek = g.lookahead(a)?;
    let parser = Parser::new(&g, peek)?;
    assert_eq!(parser.parse_all(Text::new("ab"))?.len(), 1);

    g.invert(peek)?;
    let parser = Parser::new(&g, peek)?;
    assert!(parser.parse_all(Text::new("ab"))?.is_empty());
    assert_eq!(parser.parse_all(Text::new("ba"))?.len(), 1);
    Ok(())
}

#[test]
fn node_transforms_build_trees() -> Result<()> {
    let mut g = Grammar::new();
    let key = g.any_of(IntervalSet::range('a', 'z'))?;
    let eq = g.literal("=")?;
    let val = g.any_of(IntervalSet::range('0', '9'))?;
    let pair = g.sequence(&[key, eq, val])?;
    let node = g.transform(pair, Transform::node("pair"))?;

    let parser = Parser::new(&g, node)?;
    let values = parser.parse(Text::new("x=1"))?;
    let want = Value::node(
        "pair",
        vec![Value::text("x"), Value::text("="), Value::text("1")],
    );
    assert_eq!(values, Some(vec![want.clone()]));
    assert_eq!(want.to_string(), r#"pair("x", "=", "1")"#);
    Ok(())
}

#[test]
fn step_limit_applies_per_run() -> Result<()> {
    let mut g = Grammar::new();
    let a = g.literal("a")?;
    let star = g.repeat(a, 0, None, Order::BreadthFirst)?;
    let parser = Parser::builder()
        .configure(Config::new().step_limit(Some(50)))
        .build(&g, star)?;
    let err = parser.parse_all(Text::new(&"a".repeat(100))).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::StepLimitExceeded { limit: 50 });
    assert!(parser.parse(Text::new("a"))?.is_some());
    Ok(())
}
