use chrono::{Duration, Utc};
use uuid::Uuid;

use elearning_backend::models::credential::StudentCredential;
use elearning_backend::models::question::{Question, QuestionType};
use elearning_backend::models::registration::RegistrationStatus;
use elearning_backend::services::attempt_service::exceeds_allowance;
use elearning_backend::services::face_service::FaceService;
use elearning_backend::services::gate::{evaluate, GateContext, GateDenial};
use elearning_backend::services::scoring::score_answers;
use elearning_backend::utils::assessment::generate_assessment_number;

fn credential(number: &str) -> StudentCredential {
    StudentCredential {
        student_id: Uuid::new_v4(),
        assessment_number: number.to_string(),
        is_whitelisted: true,
        face_template: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn question(id: i32, correct: &str, points: i32) -> Question {
    Question {
        id,
        text: format!("Q{}", id),
        question_type: QuestionType::Text,
        options: None,
        correct_answer: correct.to_string(),
        points,
    }
}

/// A shortlisted, whitelisted student with the right number inside the
/// window clears the gate; scoring then grades the submitted answers.
#[test]
fn shortlisted_student_passes_gate_and_is_scored() {
    let number = generate_assessment_number(7);
    let cred = credential(&number);
    let now = Utc::now();

    let ctx = GateContext {
        supplied_assessment_number: &number,
        credential: Some(&cred),
        registration_status: Some(RegistrationStatus::Shortlisted),
        requires_registration: true,
        exam_start: now - Duration::minutes(10),
        exam_end: now + Duration::minutes(50),
        now,
    };
    assert_eq!(evaluate(&ctx), Ok(()));

    let questions = vec![question(1, "Nairobi", 5), question(2, "A", 5)];
    let answers = vec![(1, " Nairobi ".to_string()), (2, "a".to_string())];
    let result = score_answers(&questions, &answers);
    assert_eq!(result.score, 5);
    assert_eq!(result.max_score, 10);
}

#[test]
fn gate_denials_fire_in_documented_order() {
    let cred = credential("AS-7-1a2b3c");
    let now = Utc::now();
    let base = |at| GateContext {
        supplied_assessment_number: "AS-7-1a2b3c",
        credential: Some(&cred),
        registration_status: Some(RegistrationStatus::Shortlisted),
        requires_registration: true,
        exam_start: now - Duration::minutes(10),
        exam_end: now + Duration::minutes(50),
        now: at,
    };

    let mut wrong_number = base(now);
    wrong_number.supplied_assessment_number = "AS-7-000000";
    assert_eq!(
        evaluate(&wrong_number),
        Err(GateDenial::InvalidAssessmentNumber)
    );

    let mut not_shortlisted = base(now);
    not_shortlisted.registration_status = Some(RegistrationStatus::Registered);
    assert_eq!(evaluate(&not_shortlisted), Err(GateDenial::NotShortlisted));

    let closed = base(now + Duration::minutes(60));
    assert_eq!(evaluate(&closed), Err(GateDenial::OutsideWindow));
}

#[test]
fn disqualification_triggers_past_the_allowance_not_at_it() {
    let max = 3;
    let mut count = 0;
    let mut disqualified_at = None;
    for _ in 0..5 {
        count += 1;
        if disqualified_at.is_none() && exceeds_allowance(count, max) {
            disqualified_at = Some(count);
        }
    }
    assert_eq!(disqualified_at, Some(4));
}

#[tokio::test]
async fn face_stub_round_trips_enrollment_and_verification() {
    let face = FaceService::new(None);
    let template = face.generate_template(b"enrollment-image").await.unwrap();

    let same = face
        .verify_match(b"enrollment-image", &template)
        .await
        .unwrap();
    let different = face.verify_match(b"someone-else", &template).await.unwrap();
    assert!(same >= 0.9);
    assert!(different < 0.5);
}

#[test]
fn assessment_numbers_embed_the_school_code() {
    for code in [1, 7, 42] {
        let number = generate_assessment_number(code);
        assert!(number.starts_with(&format!("AS-{}-", code)));
    }
}
