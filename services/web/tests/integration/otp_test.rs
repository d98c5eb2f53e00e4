use chrono::Utc;

use schoolhub_web::error::WebServiceError;
use schoolhub_web::usecase::otp::{
    Delivery, RequestCodeInput, RequestCodeUseCase, VerifyCodeInput, VerifyCodeUseCase,
};

use crate::helpers::{
    MockMailer, MockOtpRepo, MockUserRepo, existing_user, stored_code, ten_minutes, test_keys,
};

fn request(codes: &MockOtpRepo, mailer: MockMailer) -> RequestCodeUseCase<MockOtpRepo, MockMailer> {
    RequestCodeUseCase {
        codes: codes.clone(),
        mailer,
        ttl: ten_minutes(),
    }
}

fn verify(
    codes: &MockOtpRepo,
    users: MockUserRepo,
) -> VerifyCodeUseCase<MockOtpRepo, MockUserRepo> {
    VerifyCodeUseCase {
        codes: codes.clone(),
        users,
        keys: test_keys(),
    }
}

fn verify_input(email: &str, otp: &str) -> VerifyCodeInput {
    VerifyCodeInput {
        email: Some(email.to_owned()),
        otp: Some(otp.to_owned()),
        name: None,
    }
}

#[tokio::test]
async fn should_store_and_deliver_six_digit_code() {
    let codes = MockOtpRepo::empty();
    let mailer = MockMailer::default();
    let sent = mailer.sent_handle();

    let before = Utc::now();
    let issued = request(&codes, mailer)
        .execute(RequestCodeInput {
            email: Some("a@b.com".to_owned()),
        })
        .await
        .unwrap();

    assert!(matches!(issued.delivery, Delivery::Sent));
    assert_eq!(issued.code.len(), 6);
    assert!(issued.code.bytes().all(|b| b.is_ascii_digit()));

    let stored = codes.codes_handle().lock().unwrap().clone();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].email, "a@b.com");
    assert_eq!(stored[0].code, issued.code);
    assert!(stored[0].expires_at >= before + ten_minutes());
    assert!(stored[0].expires_at <= Utc::now() + ten_minutes());

    assert_eq!(
        sent.lock().unwrap().as_slice(),
        &[("a@b.com".to_owned(), issued.code.clone())]
    );
}

#[tokio::test]
async fn should_reject_malformed_email_without_storing() {
    let codes = MockOtpRepo::empty();
    for email in [None, Some(""), Some("not-an-email"), Some("a@b"), Some("a b@c.com")] {
        let result = request(&codes, MockMailer::default())
            .execute(RequestCodeInput {
                email: email.map(str::to_owned),
            })
            .await;
        let expected = "Valid email is required";
        assert!(
            matches!(&result, Err(WebServiceError::Validation(m)) if m == expected),
            "expected validation error for {email:?}, got {result:?}"
        );
    }
    assert!(codes.codes_handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_keep_code_valid_when_delivery_fails() {
    let codes = MockOtpRepo::empty();
    let issued = request(&codes, MockMailer::failing())
        .execute(RequestCodeInput {
            email: Some("a@b.com".to_owned()),
        })
        .await
        .unwrap();

    assert!(matches!(issued.delivery, Delivery::Failed(_)));

    let out = verify(&codes, MockUserRepo::default())
        .execute(verify_input("a@b.com", &issued.code))
        .await
        .unwrap();
    assert_eq!(out.user.email, "a@b.com");
}

#[tokio::test]
async fn should_verify_code_exactly_once() {
    let codes = MockOtpRepo::empty();
    let issued = request(&codes, MockMailer::default())
        .execute(RequestCodeInput {
            email: Some("a@b.com".to_owned()),
        })
        .await
        .unwrap();
    let uc = verify(&codes, MockUserRepo::default());

    uc.execute(verify_input("a@b.com", &issued.code))
        .await
        .unwrap();
    let second = uc.execute(verify_input("a@b.com", &issued.code)).await;

    assert!(
        matches!(second, Err(WebServiceError::InvalidOrExpiredCode)),
        "expected InvalidOrExpiredCode, got {second:?}"
    );
    assert!(codes.codes_handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_reject_expired_code() {
    let codes = MockOtpRepo::empty();
    codes
        .codes_handle()
        .lock()
        .unwrap()
        .push(stored_code("a@b.com", "123456", Utc::now() - chrono::Duration::seconds(1)));

    let result = verify(&codes, MockUserRepo::default())
        .execute(verify_input("a@b.com", "123456"))
        .await;

    assert!(matches!(result, Err(WebServiceError::InvalidOrExpiredCode)));
}

#[tokio::test]
async fn should_reject_wrong_code_and_other_email_alike() {
    let codes = MockOtpRepo::empty();
    codes
        .codes_handle()
        .lock()
        .unwrap()
        .push(stored_code("a@b.com", "123456", Utc::now() + ten_minutes()));
    let uc = verify(&codes, MockUserRepo::default());

    let wrong_code = uc.execute(verify_input("a@b.com", "654321")).await;
    let wrong_email = uc.execute(verify_input("c@d.com", "123456")).await;

    assert!(matches!(wrong_code, Err(WebServiceError::InvalidOrExpiredCode)));
    assert!(matches!(wrong_email, Err(WebServiceError::InvalidOrExpiredCode)));
    // A failed attempt does not burn the code.
    assert_eq!(codes.codes_handle().lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_invalidate_previous_code_on_new_request() {
    let codes = MockOtpRepo::empty();
    codes
        .codes_handle()
        .lock()
        .unwrap()
        .push(stored_code("a@b.com", "111111", Utc::now() + ten_minutes()));

    let issued = request(&codes, MockMailer::default())
        .execute(RequestCodeInput {
            email: Some("a@b.com".to_owned()),
        })
        .await
        .unwrap();

    let stored = codes.codes_handle().lock().unwrap().clone();
    assert_eq!(stored.len(), 1, "only the newest code may remain");
    assert_eq!(stored[0].code, issued.code);

    if issued.code != "111111" {
        let old = verify(&codes, MockUserRepo::default())
            .execute(verify_input("a@b.com", "111111"))
            .await;
        assert!(matches!(old, Err(WebServiceError::InvalidOrExpiredCode)));
    }
}

#[tokio::test]
async fn should_not_touch_codes_of_other_emails() {
    let codes = MockOtpRepo::empty();
    codes
        .codes_handle()
        .lock()
        .unwrap()
        .push(stored_code("other@b.com", "222222", Utc::now() + ten_minutes()));

    request(&codes, MockMailer::default())
        .execute(RequestCodeInput {
            email: Some("a@b.com".to_owned()),
        })
        .await
        .unwrap();

    assert_eq!(codes.codes_handle().lock().unwrap().len(), 2);
}

#[tokio::test]
async fn should_let_only_one_concurrent_verification_succeed() {
    let codes = MockOtpRepo::empty();
    codes
        .codes_handle()
        .lock()
        .unwrap()
        .push(stored_code("a@b.com", "123456", Utc::now() + ten_minutes()));
    let first = verify(&codes, MockUserRepo::default());
    let second = verify(&codes, MockUserRepo::default());

    let (a, b) = tokio::join!(
        first.execute(verify_input("a@b.com", "123456")),
        second.execute(verify_input("a@b.com", "123456")),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one verification must win");
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(WebServiceError::InvalidOrExpiredCode)));
}

#[tokio::test]
async fn should_require_email_and_otp() {
    let codes = MockOtpRepo::empty();
    let uc = verify(&codes, MockUserRepo::default());

    for (email, otp) in [(None, Some("123456")), (Some("a@b.com"), None), (Some(" "), Some("1"))] {
        let result = uc
            .execute(VerifyCodeInput {
                email: email.map(str::to_owned),
                otp: otp.map(str::to_owned),
                name: None,
            })
            .await;
        let expected = "Email and OTP are required";
        assert!(
            matches!(&result, Err(WebServiceError::Validation(m)) if m == expected),
            "got {result:?}"
        );
    }
}

#[tokio::test]
async fn should_name_new_user_after_email_local_part() {
    let codes = MockOtpRepo::empty();
    codes
        .codes_handle()
        .lock()
        .unwrap()
        .push(stored_code("priya.sharma@school.org", "123456", Utc::now() + ten_minutes()));

    let out = verify(&codes, MockUserRepo::default())
        .execute(verify_input("priya.sharma@school.org", "123456"))
        .await
        .unwrap();

    assert_eq!(out.user.name, "priya.sharma");
    assert!(!out.user.is_admin);
}

#[tokio::test]
async fn should_use_supplied_name_for_new_user() {
    let codes = MockOtpRepo::empty();
    codes
        .codes_handle()
        .lock()
        .unwrap()
        .push(stored_code("a@b.com", "123456", Utc::now() + ten_minutes()));

    let out = verify(&codes, MockUserRepo::default())
        .execute(VerifyCodeInput {
            name: Some("  Asha  ".to_owned()),
            ..verify_input("a@b.com", "123456")
        })
        .await
        .unwrap();

    assert_eq!(out.user.name, "Asha");
}

#[tokio::test]
async fn should_keep_existing_name_and_refresh_last_login() {
    let existing = existing_user("a@b.com", "Original");
    let users = MockUserRepo::new(vec![existing.clone()]);
    let users_handle = users.users_handle();
    let codes = MockOtpRepo::empty();
    codes
        .codes_handle()
        .lock()
        .unwrap()
        .push(stored_code("a@b.com", "123456", Utc::now() + ten_minutes()));

    let out = verify(&codes, users)
        .execute(VerifyCodeInput {
            name: Some("Renamed".to_owned()),
            ..verify_input("a@b.com", "123456")
        })
        .await
        .unwrap();

    assert_eq!(out.user.id, existing.id);
    assert_eq!(out.user.name, "Original");
    assert!(out.user.last_login > existing.last_login);
    assert_eq!(users_handle.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_issue_session_for_verified_email() {
    let codes = MockOtpRepo::empty();
    let issued = request(&codes, MockMailer::default())
        .execute(RequestCodeInput {
            email: Some("a@b.com".to_owned()),
        })
        .await
        .unwrap();

    let out = verify(&codes, MockUserRepo::default())
        .execute(verify_input("a@b.com", &issued.code))
        .await
        .unwrap();

    let session = test_keys().verify(&out.session.token).unwrap();
    assert_eq!(session.email, "a@b.com");
    assert_eq!(session.id, out.user.id);
}
