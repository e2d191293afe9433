use quizmaster::{Diagnostic, ParseError, QuestionError, parse_quiz, render_quiz_text};

#[test]
fn parses_single_question_quiz() {
    let parsed = parse_quiz(
        "Capitals\n\n1. Capital of France?\na) Berlin\nb) Paris\n**Answer: b) Paris**",
        None,
    )
    .expect("quiz should parse");

    let quiz = parsed.into_quiz();
    assert_eq!(quiz.title, "Capitals");
    assert_eq!(quiz.questions.len(), 1);
    assert_eq!(quiz.questions[0].text, "Capital of France?");
    assert_eq!(quiz.questions[0].options, vec!["a) Berlin", "b) Paris"]);
    assert_eq!(quiz.questions[0].stripped_options(), vec!["Berlin", "Paris"]);
    assert_eq!(quiz.questions[0].correct_answer, "Paris");
}

#[test]
fn two_lines_are_too_short() {
    let error = parse_quiz("Capitals\n\n1. Capital of France?\n", None).expect_err("too short");

    assert_eq!(error, ParseError::TooShort { lines: 2 });
    assert_eq!(error.to_string(), "Text is too short to be a quiz.");
}

#[test]
fn unfinished_question_is_not_a_quiz() {
    let error = parse_quiz(
        "Capitals\n1. Capital of France?\na) Berlin\nb) Paris",
        None,
    )
    .expect_err("no answer line");

    assert_eq!(error, ParseError::NoValidQuestions { discarded: 1 });
    assert_eq!(error.to_string(), "No valid questions found. Check the format.");
}

#[test]
fn keeps_blocks_in_order_and_reports_skipped_lines() {
    let raw = "\
World quiz

1. Capital of France?
a) Berlin
b) Paris
**Answer: b) Paris**

2. A question nobody finished
a) Yes

3. Largest ocean?
A. Atlantic
B. Pacific
Answer: B. Pacific

Answer: c) stray
";
    let parsed = parse_quiz(raw, None).expect("quiz should parse");

    let texts: Vec<&str> = parsed
        .quiz
        .questions
        .iter()
        .map(|question| question.text.as_str())
        .collect();
    assert_eq!(texts, vec!["Capital of France?", "Largest ocean?"]);
    assert_eq!(parsed.quiz.questions[1].correct_answer, "Pacific");
    assert_eq!(parsed.discarded_questions(), 1);
    assert!(parsed.diagnostics.contains(&Diagnostic::DiscardedQuestion {
        line: 8,
        stem: "A question nobody finished".to_string(),
    }));
    assert!(parsed.diagnostics.iter().any(|diagnostic| matches!(
        diagnostic,
        Diagnostic::OrphanAnswer { line: 16, .. }
    )));
}

#[test]
fn answer_must_name_an_option() {
    let error = parse_quiz(
        "Capitals\n1. Capital of France?\na) Berlin\nb) Paris\n**Answer: Lyon**",
        None,
    )
    .expect_err("Lyon is not an option");

    assert!(matches!(
        error,
        ParseError::InvalidQuestion {
            line: 2,
            source: QuestionError::AnswerNotInOptions { .. }
        }
    ));
}

#[test]
fn rendered_text_parses_back_to_same_questions() {
    let original = parse_quiz(
        "Capitals\n1. Capital of France?\na) Berlin\nb) Paris\n**Answer: b) Paris**\n\
         2. Capital of Italy?\na) Rome\nb) Madrid\n**Answer: a) Rome**",
        None,
    )
    .expect("quiz should parse")
    .into_quiz();

    let edited = parse_quiz(&render_quiz_text(&original), Some(&original))
        .expect("rendered text should parse")
        .into_quiz();

    assert_eq!(edited.id, original.id);
    assert_eq!(edited.title, original.title);
    assert_eq!(edited.questions.len(), 2);
    for (before, after) in original.questions.iter().zip(&edited.questions) {
        assert_eq!(after.text, before.text);
        assert_eq!(after.options, before.options);
        assert_eq!(after.stripped_answer(), before.stripped_answer());
    }
}
