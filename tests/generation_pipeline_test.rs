mod common;

use std::time::Duration;

use trip_planner_api::models::itinerary::GenerationRequest;
use trip_planner_api::services::{
    cancellation::CancellationToken,
    generation_events::{AttemptOutcome, GenerationEvent},
    itinerary_generation_service::{GenerationConfig, GenerationError},
    text_generation::ProviderError,
};

use common::{
    fast_config, generator_with, kyoto_itinerary_json, overloaded, ScriptedProvider, FALLBACK,
    PRIMARY,
};

fn kyoto_request() -> GenerationRequest {
    GenerationRequest {
        destination: Some("Kyoto".to_string()),
        days: Some(2),
        budget: Some("Medium".to_string()),
        interests: vec!["Cultural".to_string()],
    }
}

#[tokio::test]
async fn kyoto_request_returns_two_full_days() {
    let (generator, observer) =
        generator_with(ScriptedProvider::always(&kyoto_itinerary_json()), fast_config());

    let itinerary = generator
        .generate(&kyoto_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(itinerary.days.len(), 2);
    for (index, day) in itinerary.days.iter().enumerate() {
        assert_eq!(day.day as usize, index + 1);
        assert_eq!(day.activities.len(), 3);
    }

    let first = &itinerary.days[0].activities[0];
    assert_eq!(first.time, "Morning");
    assert_eq!(first.activity, "Fushimi Inari Taisha");
    assert_eq!(first.kind, "Cultural");
    assert_eq!(first.cost, "Free");
    assert_eq!(
        itinerary.days[1].activities[2].activity,
        "Kaiseki dinner in Pontocho"
    );

    assert_eq!(generator.provider().calls(), vec![PRIMARY.to_string()]);
    assert!(matches!(
        observer.events().last(),
        Some((_, GenerationEvent::Completed { days: 2 }))
    ));
}

#[tokio::test]
async fn fenced_response_is_accepted() {
    let fenced = format!("```json\n{}\n```", kyoto_itinerary_json());
    let (fenced_generator, _) = generator_with(ScriptedProvider::always(&fenced), fast_config());
    let (bare_generator, _) =
        generator_with(ScriptedProvider::always(&kyoto_itinerary_json()), fast_config());

    let cancel = CancellationToken::new();
    let from_fenced = fenced_generator.generate(&kyoto_request(), &cancel).await.unwrap();
    let from_bare = bare_generator.generate(&kyoto_request(), &cancel).await.unwrap();

    assert_eq!(from_fenced, from_bare);
}

#[tokio::test]
async fn overloaded_everywhere_makes_exactly_six_attempts() {
    let (generator, observer) =
        generator_with(ScriptedProvider::always_overloaded(), fast_config());

    let err = generator
        .generate(&kyoto_request(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        GenerationError::ProviderUnavailable {
            model, attempts, ..
        } => {
            assert_eq!(model, FALLBACK);
            assert_eq!(attempts, 6);
        }
        other => panic!("expected ProviderUnavailable, got {:?}", other),
    }

    let provider = generator.provider();
    assert_eq!(provider.calls_for(PRIMARY), 3);
    assert_eq!(provider.calls_for(FALLBACK), 3);
    assert_eq!(provider.total_calls(), 6);

    // Primary cycle strictly before the fallback cycle.
    let calls = provider.calls();
    assert!(calls[..3].iter().all(|m| m == PRIMARY));
    assert!(calls[3..].iter().all(|m| m == FALLBACK));

    let attempts = observer.attempts();
    assert_eq!(attempts.len(), 6);
    assert_eq!(
        attempts.iter().map(|a| a.attempt).collect::<Vec<_>>(),
        vec![0, 1, 2, 0, 1, 2]
    );
    assert!(attempts
        .iter()
        .all(|a| matches!(a.outcome, AttemptOutcome::Retryable { .. })));

    let fallbacks = observer
        .events()
        .into_iter()
        .filter(|(_, e)| matches!(e, GenerationEvent::FallbackEngaged { .. }))
        .count();
    assert_eq!(fallbacks, 1);
}

#[tokio::test]
async fn fallback_model_can_rescue_the_request() {
    let json = kyoto_itinerary_json();
    let provider = ScriptedProvider::new(move |model, _| {
        if model == PRIMARY {
            Err(overloaded(model))
        } else {
            Ok(json.clone())
        }
    });
    let (generator, _) = generator_with(provider, fast_config());

    let itinerary = generator
        .generate(&kyoto_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(itinerary.days.len(), 2);
    assert_eq!(generator.provider().calls_for(PRIMARY), 3);
    assert_eq!(generator.provider().calls_for(FALLBACK), 1);
}

#[tokio::test]
async fn recovery_within_primary_cycle_skips_fallback() {
    let json = kyoto_itinerary_json();
    let provider = ScriptedProvider::new(move |model, index| {
        if index < 2 {
            Err(overloaded(model))
        } else {
            Ok(json.clone())
        }
    });
    let (generator, observer) = generator_with(provider, fast_config());

    generator
        .generate(&kyoto_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(generator.provider().calls_for(PRIMARY), 3);
    assert_eq!(generator.provider().calls_for(FALLBACK), 0);
    assert!(!observer
        .events()
        .iter()
        .any(|(_, e)| matches!(e, GenerationEvent::FallbackEngaged { .. })));
}

#[tokio::test]
async fn non_retryable_error_stops_after_one_attempt() {
    let provider = ScriptedProvider::new(|_, _| {
        Err(ProviderError::Status {
            status: 400,
            message: "API key not valid".to_string(),
        })
    });
    let (generator, observer) = generator_with(provider, fast_config());

    let err = generator
        .generate(&kyoto_request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GenerationError::ProviderUnavailable { attempts: 1, .. }
    ));
    assert_eq!(generator.provider().total_calls(), 1);

    let attempts = observer.attempts();
    assert_eq!(attempts.len(), 1);
    assert!(matches!(attempts[0].outcome, AttemptOutcome::Fatal { .. }));
}

#[tokio::test]
async fn missing_api_key_is_a_configuration_error() {
    let provider = ScriptedProvider::new(|_, _| {
        Err(ProviderError::Configuration("GEMINI_API_KEY is missing".to_string()))
    });
    let (generator, _) = generator_with(provider, fast_config());

    let err = generator
        .generate(&kyoto_request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Configuration(_)));
    assert_eq!(generator.provider().total_calls(), 1);
}

#[tokio::test]
async fn prose_response_is_malformed_and_keeps_raw_text() {
    let apology = "Sorry, I can't help with that.";
    let (generator, _) = generator_with(ScriptedProvider::always(apology), fast_config());

    let err = generator
        .generate(&kyoto_request(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        GenerationError::MalformedResponse { raw, .. } => assert_eq!(raw, apology),
        other => panic!("expected MalformedResponse, got {:?}", other),
    }
    assert_eq!(generator.provider().total_calls(), 1);
}

#[tokio::test]
async fn wrong_day_count_is_malformed() {
    let mut request = kyoto_request();
    request.days = Some(3);
    let (generator, _) =
        generator_with(ScriptedProvider::always(&kyoto_itinerary_json()), fast_config());

    let err = generator
        .generate(&request, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::MalformedResponse { .. }));
}

#[test]
fn missing_days_is_rejected_without_calling_the_provider() {
    let (generator, observer) =
        generator_with(ScriptedProvider::always(&kyoto_itinerary_json()), fast_config());
    let request = GenerationRequest {
        days: None,
        ..kyoto_request()
    };

    let err = tokio_test::block_on(generator.generate(&request, &CancellationToken::new()))
        .unwrap_err();

    assert!(matches!(err, GenerationError::Caller(_)));
    assert_eq!(generator.provider().total_calls(), 0);
    assert!(matches!(
        observer.events().as_slice(),
        [(_, GenerationEvent::Rejected { .. })]
    ));
}

#[test]
fn missing_budget_is_rejected_without_calling_the_provider() {
    let (generator, _) =
        generator_with(ScriptedProvider::always(&kyoto_itinerary_json()), fast_config());
    let request = GenerationRequest {
        budget: None,
        ..kyoto_request()
    };

    let err = tokio_test::block_on(generator.generate(&request, &CancellationToken::new()))
        .unwrap_err();

    assert!(matches!(err, GenerationError::Caller(_)));
    assert_eq!(generator.provider().total_calls(), 0);
}

#[tokio::test]
async fn events_share_the_request_id() {
    let (generator, observer) =
        generator_with(ScriptedProvider::always_overloaded(), fast_config());

    let _ = generator
        .generate_with_id("req-42", &kyoto_request(), &CancellationToken::new())
        .await;

    let events = observer.events();
    assert!(!events.is_empty());
    assert!(events.iter().all(|(id, _)| id == "req-42"));
    assert!(matches!(events.first(), Some((_, GenerationEvent::Started { .. }))));
    assert!(matches!(
        events.last(),
        Some((_, GenerationEvent::Failed { code: "PROVIDER_UNAVAILABLE", .. }))
    ));
}

#[tokio::test]
async fn disabled_fallback_stops_after_primary_cycle() {
    let config = GenerationConfig {
        fallback_model: None,
        ..fast_config()
    };
    let (generator, _) = generator_with(ScriptedProvider::always_overloaded(), config);

    let err = generator
        .generate(&kyoto_request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GenerationError::ProviderUnavailable { attempts: 3, .. }
    ));
    assert_eq!(generator.provider().total_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_delay_is_applied_between_attempts() {
    let (generator, _) = generator_with(
        ScriptedProvider::always_overloaded(),
        GenerationConfig::default(),
    );

    let started = tokio::time::Instant::now();
    let _ = generator
        .generate(&kyoto_request(), &CancellationToken::new())
        .await;
    let elapsed = started.elapsed();

    // Two waits per model, none after a model's last attempt.
    assert!(elapsed >= Duration::from_secs(4), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_backoff() {
    let (generator, observer) = generator_with(
        ScriptedProvider::always_overloaded(),
        GenerationConfig::default(),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let err = generator
        .generate(&kyoto_request(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Cancelled));
    assert_eq!(generator.provider().total_calls(), 1);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(matches!(
        observer.events().last(),
        Some((_, GenerationEvent::Cancelled))
    ));
}

#[tokio::test]
async fn already_cancelled_token_makes_no_calls() {
    let (generator, _) =
        generator_with(ScriptedProvider::always(&kyoto_itinerary_json()), fast_config());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = generator.generate(&kyoto_request(), &cancel).await.unwrap_err();

    assert!(matches!(err, GenerationError::Cancelled));
    assert_eq!(generator.provider().total_calls(), 0);
}
