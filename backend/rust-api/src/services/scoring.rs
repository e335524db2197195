use std::collections::BTreeMap;

use crate::models::Question;

/// Scores an answer sheet against a ticket's questions.
///
/// Returns the per-question correctness map (keyed by question index as a
/// string, like the stored submission shape) and the number of correct
/// answers. An unanswered question counts as incorrect. No partial credit,
/// no negative marking.
pub fn score(
    questions: &[Question],
    answers: &BTreeMap<String, String>,
) -> (BTreeMap<String, bool>, u32) {
    let mut correctness = BTreeMap::new();
    let mut total = 0u32;

    for (index, question) in questions.iter().enumerate() {
        let correct = answers
            .get(&index.to_string())
            .is_some_and(|answer| *answer == question.correct_answer);
        if correct {
            total += 1;
        }
        correctness.insert(index.to_string(), correct);
    }

    (correctness, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions_with_answers(correct: [&str; 3]) -> Vec<Question> {
        correct
            .iter()
            .map(|label| Question {
                question: "Which option is correct?".to_string(),
                options: BTreeMap::from([
                    ("A".to_string(), "First".to_string()),
                    ("B".to_string(), "Second".to_string()),
                    ("C".to_string(), "Third".to_string()),
                    ("D".to_string(), "Fourth".to_string()),
                ]),
                correct_answer: label.to_string(),
                explanation: "See the lecture notes.".to_string(),
            })
            .collect()
    }

    fn answer_sheet(answers: &[(&str, &str)]) -> BTreeMap<String, String> {
        answers
            .iter()
            .map(|(index, label)| (index.to_string(), label.to_string()))
            .collect()
    }

    #[test]
    fn two_of_three_correct() {
        let questions = questions_with_answers(["B", "C", "A"]);
        let answers = answer_sheet(&[("0", "B"), ("1", "C"), ("2", "D")]);

        let (correctness, total) = score(&questions, &answers);

        assert_eq!(total, 2);
        assert_eq!(correctness.get("0"), Some(&true));
        assert_eq!(correctness.get("1"), Some(&true));
        assert_eq!(correctness.get("2"), Some(&false));
    }

    #[test]
    fn unanswered_question_counts_as_incorrect() {
        let questions = questions_with_answers(["A", "A", "A"]);
        let answers = answer_sheet(&[("0", "A")]);

        let (correctness, total) = score(&questions, &answers);

        assert_eq!(total, 1);
        assert_eq!(correctness.get("1"), Some(&false));
        assert_eq!(correctness.get("2"), Some(&false));
        assert_eq!(correctness.len(), 3);
    }

    #[test]
    fn scoring_is_idempotent() {
        let questions = questions_with_answers(["D", "B", "C"]);
        let answers = answer_sheet(&[("0", "D"), ("1", "B"), ("2", "C")]);

        let first = score(&questions, &answers);
        let second = score(&questions, &answers);

        assert_eq!(first, second);
        assert_eq!(first.1, 3);
    }

    #[test]
    fn no_questions_scores_zero() {
        let (correctness, total) = score(&[], &BTreeMap::new());
        assert_eq!(total, 0);
        assert!(correctness.is_empty());
    }
}
