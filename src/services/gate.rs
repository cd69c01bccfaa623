use chrono::{DateTime, Utc};

use crate::models::credential::StudentCredential;
use crate::models::registration::RegistrationStatus;

/// Everything the start gate needs to decide, fetched up front so the
/// decision itself is a pure read-only function.
#[derive(Debug)]
pub struct GateContext<'a> {
    pub supplied_assessment_number: &'a str,
    pub credential: Option<&'a StudentCredential>,
    pub registration_status: Option<RegistrationStatus>,
    pub requires_registration: bool,
    pub exam_start: DateTime<Utc>,
    pub exam_end: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDenial {
    InvalidAssessmentNumber,
    Blacklisted,
    NotShortlisted,
    OutsideWindow,
}

impl GateDenial {
    pub fn message(&self) -> &'static str {
        match self {
            GateDenial::InvalidAssessmentNumber => "Invalid assessment number provided.",
            GateDenial::Blacklisted => {
                "Assessment number is blacklisted due to administrative reasons."
            }
            GateDenial::NotShortlisted => {
                "You are not shortlisted for this exam. Check registration status or contact admin."
            }
            GateDenial::OutsideWindow => "The exam is not open at this time.",
        }
    }
}

/// Runs the four start-gate checks in fixed order, short-circuiting on the
/// first failure:
///
/// 1. supplied assessment number matches the stored credential,
/// 2. the student is whitelisted,
/// 3. a SHORTLISTED registration exists (when the exam requires one),
/// 4. the current time falls within the exam window.
///
/// The caller creates the attempt only after this returns `Ok`.
pub fn evaluate(ctx: &GateContext) -> Result<(), GateDenial> {
    let Some(credential) = ctx.credential else {
        return Err(GateDenial::InvalidAssessmentNumber);
    };
    if credential.assessment_number != ctx.supplied_assessment_number {
        return Err(GateDenial::InvalidAssessmentNumber);
    }

    if !credential.is_whitelisted {
        return Err(GateDenial::Blacklisted);
    }

    if ctx.requires_registration && ctx.registration_status != Some(RegistrationStatus::Shortlisted)
    {
        return Err(GateDenial::NotShortlisted);
    }

    if ctx.now < ctx.exam_start || ctx.now > ctx.exam_end {
        return Err(GateDenial::OutsideWindow);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn credential(number: &str, whitelisted: bool) -> StudentCredential {
        StudentCredential {
            student_id: Uuid::new_v4(),
            assessment_number: number.to_string(),
            is_whitelisted: whitelisted,
            face_template: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn open_window() -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now - Duration::hours(1), now + Duration::hours(1), now)
    }

    fn passing<'a>(cred: &'a StudentCredential) -> GateContext<'a> {
        let (start, end, now) = open_window();
        GateContext {
            supplied_assessment_number: "AS-7-1a2b3c",
            credential: Some(cred),
            registration_status: Some(RegistrationStatus::Shortlisted),
            requires_registration: true,
            exam_start: start,
            exam_end: end,
            now,
        }
    }

    #[test]
    fn all_checks_pass() {
        let cred = credential("AS-7-1a2b3c", true);
        assert_eq!(evaluate(&passing(&cred)), Ok(()));
    }

    #[test]
    fn wrong_assessment_number_fails_first() {
        // Even with everything else broken, the credential check fires first.
        let cred = credential("AS-7-ffffff", false);
        let mut ctx = passing(&cred);
        ctx.registration_status = None;
        assert_eq!(evaluate(&ctx), Err(GateDenial::InvalidAssessmentNumber));
    }

    #[test]
    fn missing_credential_is_an_invalid_number() {
        let cred = credential("AS-7-1a2b3c", true);
        let mut ctx = passing(&cred);
        ctx.credential = None;
        assert_eq!(evaluate(&ctx), Err(GateDenial::InvalidAssessmentNumber));
    }

    #[test]
    fn blacklisted_student_is_denied() {
        let cred = credential("AS-7-1a2b3c", false);
        assert_eq!(evaluate(&passing(&cred)), Err(GateDenial::Blacklisted));
    }

    #[test]
    fn not_shortlisted_is_denied() {
        let cred = credential("AS-7-1a2b3c", true);
        for status in [
            None,
            Some(RegistrationStatus::Registered),
            Some(RegistrationStatus::Rejected),
        ] {
            let mut ctx = passing(&cred);
            ctx.registration_status = status;
            assert_eq!(evaluate(&ctx), Err(GateDenial::NotShortlisted));
        }
    }

    #[test]
    fn shortlist_check_skipped_when_registration_not_required() {
        let cred = credential("AS-7-1a2b3c", true);
        let mut ctx = passing(&cred);
        ctx.requires_registration = false;
        ctx.registration_status = None;
        assert_eq!(evaluate(&ctx), Ok(()));
    }

    #[test]
    fn outside_window_is_denied() {
        let cred = credential("AS-7-1a2b3c", true);

        let mut early = passing(&cred);
        early.now = early.exam_start - Duration::minutes(5);
        assert_eq!(evaluate(&early), Err(GateDenial::OutsideWindow));

        let mut late = passing(&cred);
        late.now = late.exam_end + Duration::minutes(5);
        assert_eq!(evaluate(&late), Err(GateDenial::OutsideWindow));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let cred = credential("AS-7-1a2b3c", true);

        let mut at_start = passing(&cred);
        at_start.now = at_start.exam_start;
        assert_eq!(evaluate(&at_start), Ok(()));

        let mut at_end = passing(&cred);
        at_end.now = at_end.exam_end;
        assert_eq!(evaluate(&at_end), Ok(()));
    }
}
