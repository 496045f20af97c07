use parse_automata::re::{Config, Engine, Flags, Regex, Span, SyntaxErrorKind};

use crate::Result;

fn engines() -> Vec<Config> {
    vec![
        Config::new().engine(Engine::Backtrack),
        Config::new().engine(Engine::Backtrack).compress_stack(false),
        Config::new().engine(Engine::Complex),
        Config::new().engine(Engine::Complex).lookaround_cache(false),
    ]
}

fn build(config: Config, pattern: &str) -> Result<Regex> {
    Ok(Regex::builder().configure(config).build(pattern)?)
}

fn spans(re: &Regex, haystack: &str) -> Vec<(usize, usize)> {
    re.find_iter(haystack).map(|s| (s.start, s.end)).collect()
}

#[test]
fn counted_repetition_on_every_engine() -> Result<()> {
    let mut configs = engines();
    configs.push(Config::new().engine(Engine::Simple));
    for config in configs {
        let re = build(config, "a{2}b{1,2}c")?;
        assert_eq!(re.find("aabbc"), Some(Span::new(0, 5)));
        assert_eq!(re.find("xaabcc"), Some(Span::new(1, 5)));
        assert_eq!(re.find("abbc"), None);
    }
    Ok(())
}

#[test]
fn named_captures() -> Result<()> {
    for config in engines() {
        let re = build(config, r"(?P<key>\w+)=(?<val>\d+)?;")?;
        let caps = re.captures("x; size=;n=42;").ok_or("no match")?;
        assert_eq!(caps.get_match(), Span::new(3, 9));
        assert_eq!(caps.name("key"), Some(Span::new(3, 7)));
        assert_eq!(caps.name("val"), None);

        let caps = re.captures_at("x; size=;n=42;", 8).ok_or("no match")?;
        assert_eq!(caps.name("key"), Some(Span::new(9, 10)));
        assert_eq!(caps.name("val"), Some(Span::new(11, 13)));
        assert_eq!(caps.len(), 3);
    }
    Ok(())
}

#[test]
fn iteration_over_multibyte_text() -> Result<()> {
    for config in engines() {
        let re = build(config, "x*")?;
        assert_eq!(spans(&re, "éx"), vec![(0, 0), (2, 3)]);
        let re = build(config, r"\w+")?;
        assert_eq!(spans(&re, "ab, cd"), vec![(0, 2), (4, 6)]);
    }
    Ok(())
}

#[test]
fn flags() -> Result<()> {
    for config in engines() {
        let re = build(config.flags(Flags::new().case_insensitive(true)), "abc")?;
        assert_eq!(re.find("xABC"), Some(Span::new(1, 4)));
        let re = build(config, "(?i)ab(?-i)c")?;
        assert_eq!(re.find("ABc ABC"), Some(Span::new(0, 3)));
        let re = build(config, "(?m)^b")?;
        assert_eq!(re.find("a\nb"), Some(Span::new(2, 3)));
        let re = build(config, "^b")?;
        assert_eq!(re.find("a\nb"), None);
        let re = build(config, "(?s)a.b")?;
        assert_eq!(re.find("a\nb"), Some(Span::new(0, 3)));
        let re = build(config, "a.b")?;
        assert_eq!(re.find("a\nb"), None);
        let re = build(config, "(?x) a b  # spaced out\n c")?;
        assert_eq!(re.find("abc"), Some(Span::new(0, 3)));
        let re = build(config, "(?U)a+")?;
        assert_eq!(re.find("aaa"), Some(Span::new(0, 1)));
    }
    Ok(())
}

#[test]
fn dollar_allows_a_final_newline() -> Result<()> {
    let mut configs = engines();
    configs.push(Config::new().engine(Engine::Simple));
    for config in configs {
        let re = build(config, "a$")?;
        assert_eq!(re.find("a\n"), Some(Span::new(0, 1)));
        assert_eq!(re.find("a"), Some(Span::new(0, 1)));
        assert_eq!(re.find("a\nb"), None);
        assert_eq!(re.find("a\n\n"), None);
        let re = build(config, r"a\Z")?;
        assert_eq!(re.find("a\n"), None);
        let re = build(config, "(?m)a$")?;
        assert_eq!(re.find("a\nb"), Some(Span::new(0, 1)));
    }
    Ok(())
}

#[test]
fn lookarounds_and_conditionals() -> Result<()> {
    for config in engines() {
        let re = build(config, r"\d+(?=px)")?;
        assert_eq!(spans(&re, "10em 20px 3px"), vec![(5, 7), (10, 11)]);
        let re = build(config, r"(?<!-)\b\d+")?;
        assert_eq!(spans(&re, "-4 5 -6 78"), vec![(3, 4), (8, 10)]);
        let re = build(config, r"(?<=\d{2,})x")?;
        assert_eq!(re.find("1x 12x"), Some(Span::new(5, 6)));
        let re = build(config, r"(<)?\w+(?(1)>)")?;
        assert_eq!(spans(&re, "<a> b <c"), vec![(0, 3), (4, 5), (7, 8)]);
    }
    Ok(())
}

#[test]
fn backreferences() -> Result<()> {
    for config in engines() {
        let re = build(config, r"(?P<q>['\x22]).*?(?P=q)")?;
        assert_eq!(re.find(r#"say "it's" now"#), Some(Span::new(4, 10)));
        let re = build(config, r"(?i)(\w)\1")?;
        assert_eq!(re.find("xaAy"), Some(Span::new(1, 3)));
    }
    Ok(())
}

#[test]
fn syntax_errors() {
    let cases = [
        ("a)", 1, SyntaxErrorKind::UnopenedGroup),
        ("x(a", 1, SyntaxErrorKind::UnclosedGroup),
        ("a**", 2, SyntaxErrorKind::RepetitionMissing),
        ("a{3,2}", 1, SyntaxErrorKind::InvalidRepetitionCount),
        ("[c-a]", 1, SyntaxErrorKind::InvalidClassRange),
        ("(?P<a>x)(?P<a>y)", 12, SyntaxErrorKind::DuplicateGroupName),
    ];
    for &(pattern, offset, kind) in cases.iter() {
        let err = Regex::new(pattern).unwrap_err();
        assert_eq!(err.offset(), Some(offset), "pattern {:?}", pattern);
        assert_eq!(err.syntax_kind(), Some(kind), "pattern {:?}", pattern);
        assert!(!err.to_string().is_empty());
    }
    assert!(Regex::new("(?P=nope)").unwrap_err().is_unknown_group());
}

#[test]
fn size_limit() -> Result<()> {
    let config = Config::new().size_limit(50);
    let err = Regex::builder().configure(config).build("[ab]{100}").unwrap_err();
    assert!(err.is_size_limit());
    assert!(err.offset().is_none());
    assert!(build(config, "[ab]{10}").is_ok());
    Ok(())
}

#[test]
fn simple_engine_refusals() {
    let config = Config::new().engine(Engine::Simple);
    for pattern in &["(a)", r"(?:(a))?", r"(a)\1", "(?(1)a)"] {
        let result = Regex::builder().configure(config).build(pattern);
        assert!(result.is_err(), "pattern {:?}", pattern);
    }
    let re = Regex::builder()
        .configure(config)
        .build(r"(?<=a)(?:b|c)+(?!d)")
        .unwrap();
    // "bcb" is followed by 'd', so the repetition gives one back.
    assert_eq!(re.find("abcbd abcc"), Some(Span::new(1, 3)));
    assert_eq!(re.find_at("abcbd abcc", 4), Some(Span::new(7, 10)));
    assert_eq!(re.engine(), Engine::Simple);
}
