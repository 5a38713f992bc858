/*!
 * End-to-end tests for the publish pipeline.
 *
 * Each test runs a full publish against an in-memory database with mock
 * collaborators and polls the job record to a terminal state, the same way
 * a real caller would.
 */

use std::sync::Arc;
use std::time::Duration;

use classpub::app_config::Config;
use classpub::database::models::{
    AssignmentRecord, AssignmentSettings, Choice, DisplayOptions, JobRecord, JobStatus,
    QuestionRecord, QuestionType, ScoringSpec, VariantKind,
};
use classpub::database::Repository;
use classpub::errors::PublishError;
use classpub::providers::mock::{MockDetector, MockGate, MockTranslator};
use classpub::providers::SequentialContextLinker;
use classpub::publish::{DesiredQuestion, DesiredState, DesiredVariant, PublishService};

fn settings(name: &str, introduction: Option<&str>) -> AssignmentSettings {
    AssignmentSettings {
        name: name.to_string(),
        introduction: introduction.map(String::from),
        instructions: None,
        grading_criteria_overview: None,
        time_limit_minutes: Some(30),
        attempt_limit: None,
        display_options: DisplayOptions::default(),
    }
}

fn question(id: i64, text: &str) -> DesiredQuestion {
    DesiredQuestion {
        id,
        text: text.to_string(),
        question_type: QuestionType::MultipleChoice,
        choices: vec![Choice::new("4", true), Choice::new("5", false)],
        scoring: ScoringSpec::PerChoice,
        points: 1.0,
        variants: Vec::new(),
    }
}

fn service_with(
    repo: Repository,
    translator: MockTranslator,
    gate: MockGate,
) -> PublishService {
    let _ = env_logger::builder().is_test(true).try_init();

    PublishService::new(
        repo,
        Arc::new(translator),
        Arc::new(MockDetector::fixed("en")),
        Arc::new(gate),
        Arc::new(SequentialContextLinker),
        &Config::default(),
    )
}

async fn seeded_assignment(repo: &Repository) -> i64 {
    repo.create_assignment(&AssignmentRecord::new("Fixture assignment"))
        .await
        .unwrap()
}

async fn wait_terminal(repo: &Repository, job_id: &str) -> JobRecord {
    for _ in 0..1000 {
        let job = repo.get_job(job_id).await.unwrap().unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("Job {} never reached a terminal state", job_id);
}

#[tokio::test]
async fn test_publish_mixedExistingAndNew_shouldRemapAndOrder() {
    let repo = Repository::new_in_memory().unwrap();
    let assignment_id = seeded_assignment(&repo).await;

    let existing = QuestionRecord::new(
        assignment_id,
        "What is 2+2?",
        QuestionType::MultipleChoice,
        vec![Choice::new("4", true), Choice::new("5", false)],
        ScoringSpec::PerChoice,
        1.0,
    );
    let existing_id = repo.insert_question(&existing).await.unwrap();

    let gate = MockGate::allow_all();
    let gate_calls = gate.call_counter();
    let service = service_with(repo.clone(), MockTranslator::working(), gate);

    let desired = DesiredState {
        settings: settings("Arithmetic", Some("Welcome to arithmetic")),
        questions: vec![
            question(existing_id, "What is 2+2?"),
            question(-1, "What is 3+3?"),
        ],
    };
    let receipt = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap();

    let job = wait_terminal(&repo, &receipt.job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.percentage, 100);

    // Exactly one question created, the unchanged one untouched
    let active = repo.get_active_questions(assignment_id).await.unwrap();
    assert_eq!(active.len(), 2);
    let new_id = active.iter().map(|q| q.id).find(|id| *id != existing_id).unwrap();

    let assignment = repo.get_assignment(assignment_id).await.unwrap().unwrap();
    assert!(assignment.published);
    assert_eq!(assignment.question_order, vec![existing_id, new_id]);
    assert_eq!(assignment.author_user_id.as_deref(), Some("teacher-1"));

    // Moderation ran only for the new question; the unchanged one is free
    assert_eq!(gate_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_publish_englishSource_shouldTranslateOnlyForeignLanguages() {
    let repo = Repository::new_in_memory().unwrap();
    let assignment_id = seeded_assignment(&repo).await;
    let service = service_with(repo.clone(), MockTranslator::working(), MockGate::allow_all());

    let desired = DesiredState {
        settings: settings("Arithmetic", Some("Welcome")),
        questions: vec![question(-1, "What is 2+2?")],
    };
    let receipt = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap();
    let job = wait_terminal(&repo, &receipt.job_id).await;
    assert_eq!(job.status, JobStatus::Completed);

    // Configured languages are en/fr/es and the source is detected as en,
    // so each entity gets exactly fr and es rows and no en row
    let question_id = repo.get_active_questions(assignment_id).await.unwrap()[0].id;
    let rows = repo.list_translations(assignment_id).await.unwrap();
    let mut question_languages: Vec<&str> = rows
        .iter()
        .filter(|t| t.question_id == Some(question_id))
        .map(|t| t.language_code.as_str())
        .collect();
    question_languages.sort_unstable();
    assert_eq!(question_languages, vec!["es", "fr"]);

    // Choices travelled with the question and kept their shape
    let fr = rows
        .iter()
        .find(|t| t.question_id == Some(question_id) && t.language_code == "fr")
        .unwrap();
    let translated = fr.translated_choices.as_ref().unwrap();
    assert_eq!(translated.len(), 2);
    assert_eq!(translated[0].text, "[fr] 4");
    assert!(translated[0].is_correct);
}

#[tokio::test]
async fn test_publish_missingIntroduction_shouldAbortSynchronously() {
    let repo = Repository::new_in_memory().unwrap();
    let assignment_id = seeded_assignment(&repo).await;
    let service = service_with(repo.clone(), MockTranslator::working(), MockGate::allow_all());

    let desired = DesiredState {
        settings: settings("Arithmetic", Some("   ")),
        questions: vec![question(-1, "Never persisted")],
    };
    let err = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Precondition(_)));

    // No step ran: no questions, nothing published
    assert!(repo.get_active_questions(assignment_id).await.unwrap().is_empty());
    let assignment = repo.get_assignment(assignment_id).await.unwrap().unwrap();
    assert!(!assignment.published);
    assert_eq!(assignment.name, "Fixture assignment");
}

#[tokio::test]
async fn test_publish_concurrentRuns_shouldBothCompleteLastWriteWins() {
    let repo = Repository::new_in_memory().unwrap();
    let assignment_id = seeded_assignment(&repo).await;
    let service = service_with(repo.clone(), MockTranslator::slow(3), MockGate::allow_all());

    let first = DesiredState {
        settings: settings("Version A", Some("Intro A")),
        questions: vec![question(-1, "Question from run A")],
    };
    let second = DesiredState {
        settings: settings("Version B", Some("Intro B")),
        questions: vec![question(-1, "Question from run B")],
    };

    let receipt_a = service
        .publish_assignment(assignment_id, first, "teacher-1")
        .await
        .unwrap();
    let receipt_b = service
        .publish_assignment(assignment_id, second, "teacher-2")
        .await
        .unwrap();

    let job_a = wait_terminal(&repo, &receipt_a.job_id).await;
    let job_b = wait_terminal(&repo, &receipt_b.job_id).await;
    assert_eq!(job_a.status, JobStatus::Completed);
    assert_eq!(job_b.status, JobStatus::Completed);

    // No mutual exclusion: whichever run wrote last wins, and the record
    // is one of the two submitted states rather than a torn mix of names
    let assignment = repo.get_assignment(assignment_id).await.unwrap().unwrap();
    assert!(assignment.published);
    assert!(assignment.name == "Version A" || assignment.name == "Version B");
    // Authorship is first-writer-wins, never overwritten
    let author = assignment.author_user_id.as_deref().unwrap();
    assert!(author == "teacher-1" || author == "teacher-2");
}

#[tokio::test]
async fn test_publish_duplicateContent_shouldCallProviderOncePerLanguage() {
    let repo = Repository::new_in_memory().unwrap();
    let assignment_id = seeded_assignment(&repo).await;

    let translator = MockTranslator::working();
    let provider_calls = translator.call_counter();
    let service = service_with(repo.clone(), translator, MockGate::allow_all());

    let mut twin_a = question(-1, "Identical prompt");
    twin_a.choices = Vec::new();
    twin_a.scoring = ScoringSpec::Manual;
    let mut twin_b = twin_a.clone();
    twin_b.id = -2;

    let desired = DesiredState {
        settings: settings("Twins", Some("Intro")),
        questions: vec![twin_a, twin_b],
    };
    let receipt = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap();
    let job = wait_terminal(&repo, &receipt.job_id).await;
    assert_eq!(job.status, JobStatus::Completed);

    // Unique texts: question prompt, "Twins", "Intro" - each translated
    // into fr and es once. The duplicate question reuses rows.
    assert_eq!(provider_calls.load(std::sync::atomic::Ordering::SeqCst), 6);

    let rows = repo.list_translations(assignment_id).await.unwrap();
    let question_rows = rows.iter().filter(|t| t.question_id.is_some()).count();
    assert_eq!(question_rows, 4); // 2 questions x 2 foreign languages
}

#[tokio::test]
async fn test_publish_removedQuestion_shouldSoftDeleteAndReorder() {
    let repo = Repository::new_in_memory().unwrap();
    let assignment_id = seeded_assignment(&repo).await;
    let service = service_with(repo.clone(), MockTranslator::working(), MockGate::allow_all());

    let desired = DesiredState {
        settings: settings("Two questions", Some("Intro")),
        questions: vec![question(-1, "First question"), question(-2, "Second question")],
    };
    let receipt = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap();
    wait_terminal(&repo, &receipt.job_id).await;

    let active = repo.get_active_questions(assignment_id).await.unwrap();
    let (first_id, second_id) = (active[0].id, active[1].id);

    // Republish keeping only the second question, listed first
    let desired = DesiredState {
        settings: settings("Two questions", Some("Intro")),
        questions: vec![question(second_id, "Second question")],
    };
    let receipt = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap();
    let job = wait_terminal(&repo, &receipt.job_id).await;
    assert_eq!(job.status, JobStatus::Completed);

    let active = repo.get_active_questions(assignment_id).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second_id);
    assert_ne!(first_id, second_id);

    let assignment = repo.get_assignment(assignment_id).await.unwrap().unwrap();
    assert_eq!(assignment.question_order, vec![second_id]);
}

#[tokio::test]
async fn test_publish_desiredOrder_shouldOverrideInsertionOrder() {
    let repo = Repository::new_in_memory().unwrap();
    let assignment_id = seeded_assignment(&repo).await;
    let service = service_with(repo.clone(), MockTranslator::working(), MockGate::allow_all());

    let desired = DesiredState {
        settings: settings("Ordered", Some("Intro")),
        questions: vec![question(-1, "Alpha"), question(-2, "Beta")],
    };
    let receipt = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap();
    wait_terminal(&repo, &receipt.job_id).await;
    let active = repo.get_active_questions(assignment_id).await.unwrap();
    let (alpha_id, beta_id) = (active[0].id, active[1].id);

    // Republish with the order reversed
    let desired = DesiredState {
        settings: settings("Ordered", Some("Intro")),
        questions: vec![question(beta_id, "Beta"), question(alpha_id, "Alpha")],
    };
    let receipt = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap();
    wait_terminal(&repo, &receipt.job_id).await;

    let assignment = repo.get_assignment(assignment_id).await.unwrap().unwrap();
    assert_eq!(assignment.question_order, vec![beta_id, alpha_id]);

    // Grading context follows the published order: Beta first, so Alpha
    // links back to Beta
    let active = repo.get_active_questions(assignment_id).await.unwrap();
    let alpha = active.iter().find(|q| q.id == alpha_id).unwrap();
    let beta = active.iter().find(|q| q.id == beta_id).unwrap();
    assert_eq!(beta.grading_context, Vec::<i64>::new());
    assert_eq!(alpha.grading_context, vec![beta_id]);
}

#[tokio::test]
async fn test_publish_variants_shouldTranslateAndMatchByContent() {
    let repo = Repository::new_in_memory().unwrap();
    let assignment_id = seeded_assignment(&repo).await;
    let service = service_with(repo.clone(), MockTranslator::working(), MockGate::allow_all());

    let mut with_variant = question(-1, "Base prompt");
    with_variant.variants = vec![DesiredVariant {
        text: "Easier version of the prompt".to_string(),
        choices: vec![Choice::new("4", true)],
        kind: VariantKind::Simplified,
    }];
    let desired = DesiredState {
        settings: settings("Variants", Some("Intro")),
        questions: vec![with_variant],
    };
    let receipt = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap();
    let job = wait_terminal(&repo, &receipt.job_id).await;
    assert_eq!(job.status, JobStatus::Completed);

    let question_id = repo.get_active_questions(assignment_id).await.unwrap()[0].id;
    let variants = repo.get_active_variants(question_id).await.unwrap();
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].kind, VariantKind::Simplified);

    let rows = repo.list_translations(assignment_id).await.unwrap();
    let variant_rows = rows
        .iter()
        .filter(|t| t.variant_id == Some(variants[0].id))
        .count();
    assert_eq!(variant_rows, 2); // fr and es
}

#[tokio::test]
async fn test_publish_moderationRejection_shouldFailJobWithoutRollback() {
    let repo = Repository::new_in_memory().unwrap();
    let assignment_id = seeded_assignment(&repo).await;
    let service = service_with(
        repo.clone(),
        MockTranslator::working(),
        MockGate::deny_containing("forbidden"),
    );

    let desired = DesiredState {
        settings: settings("Moderated", Some("Intro")),
        questions: vec![
            question(-1, "A fine question"),
            question(-2, "A forbidden question"),
        ],
    };
    let receipt = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap();
    let job = wait_terminal(&repo, &receipt.job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.progress_message.contains("Moderation"));
    assert!(job.result.unwrap().contains("error"));

    // No rollback: the question committed before the rejection remains,
    // but the assignment never reached finalize
    assert_eq!(repo.get_active_questions(assignment_id).await.unwrap().len(), 1);
    let assignment = repo.get_assignment(assignment_id).await.unwrap().unwrap();
    assert!(!assignment.published);
}

#[tokio::test]
async fn test_publish_providerFailure_shouldFailJobWithMessage() {
    let repo = Repository::new_in_memory().unwrap();
    let assignment_id = seeded_assignment(&repo).await;
    let service = service_with(repo.clone(), MockTranslator::failing(), MockGate::allow_all());

    let desired = DesiredState {
        settings: settings("Doomed", Some("Intro")),
        questions: vec![question(-1, "Will not translate")],
    };
    let receipt = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap();
    let job = wait_terminal(&repo, &receipt.job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.progress_message.starts_with("Publish failed"));

    let assignment = repo.get_assignment(assignment_id).await.unwrap().unwrap();
    assert!(!assignment.published);
}

#[tokio::test]
async fn test_publish_progress_shouldNeverRegressWhilePolling() {
    let repo = Repository::new_in_memory().unwrap();
    let assignment_id = seeded_assignment(&repo).await;
    let service = service_with(repo.clone(), MockTranslator::slow(5), MockGate::allow_all());

    let desired = DesiredState {
        settings: settings("Slow publish", Some("Intro")),
        questions: vec![
            question(-1, "First slow question"),
            question(-2, "Second slow question"),
            question(-3, "Third slow question"),
        ],
    };
    let receipt = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap();

    let mut samples = Vec::new();
    loop {
        let status = service.get_job_status(&receipt.job_id).await.unwrap();
        samples.push(status.percentage);
        if status.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert!(samples.windows(2).all(|w| w[0] <= w[1]), "regressed: {:?}", samples);
    assert_eq!(*samples.last().unwrap(), 100);
}

#[test]
fn test_publish_emptyQuestionList_shouldSkipQuestionsStep() {
    tokio_test::block_on(async {
        let repo = Repository::new_in_memory().unwrap();
        let assignment_id = seeded_assignment(&repo).await;
        let service =
            service_with(repo.clone(), MockTranslator::working(), MockGate::allow_all());

        let desired = DesiredState {
            settings: settings("No questions yet", Some("Intro only")),
            questions: Vec::new(),
        };
        let receipt = service
            .publish_assignment(assignment_id, desired, "teacher-1")
            .await
            .unwrap();
        let job = wait_terminal(&repo, &receipt.job_id).await;
        assert_eq!(job.status, JobStatus::Completed);

        // Assignment-level translations still happened
        let rows = repo.list_translations(assignment_id).await.unwrap();
        assert!(rows.iter().all(|t| t.question_id.is_none()));
        assert!(!rows.is_empty());

        let assignment = repo.get_assignment(assignment_id).await.unwrap().unwrap();
        assert!(assignment.published);
        assert!(assignment.question_order.is_empty());
    });
}

#[tokio::test]
async fn test_publish_resultPayload_shouldCarryStructuredQuestions() {
    let repo = Repository::new_in_memory().unwrap();
    let assignment_id = seeded_assignment(&repo).await;
    let service = service_with(repo.clone(), MockTranslator::working(), MockGate::allow_all());

    let desired = DesiredState {
        settings: settings("Payload", Some("Intro")),
        questions: vec![question(-1, "What is 2+2?")],
    };
    let receipt = service
        .publish_assignment(assignment_id, desired, "teacher-1")
        .await
        .unwrap();
    wait_terminal(&repo, &receipt.job_id).await;

    let status = service.get_job_status(&receipt.job_id).await.unwrap();
    let payload = status.result.expect("completed job carries a payload");
    let questions = payload["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 1);
    // Choices come back parsed, not as an opaque string
    let choices = questions[0]["record"]["choices"].as_array().unwrap();
    assert_eq!(choices[0]["text"], "4");
    assert_eq!(choices[0]["is_correct"], true);
}
