//! Integration tests for telegram-client.
//!
//! Live tests need a real bot token:
//!   BOT_TOKEN=... cargo test --test integration_tests -- --ignored

use telegram_client::{
    ApiResponse, BotConfig, InlineKeyboardButton, InlineKeyboardMarkup, SendMessageParams,
    TelegramClient, TelegramError, Update,
};

// ============================================================================
// Unit tests (no network required)
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let config = BotConfig::new("123:abc");
        assert_eq!(config.base_url, "https://api.telegram.org");
        assert_eq!(config.poll_timeout_secs, 25);
    }

    #[test]
    fn test_method_url() {
        let config = BotConfig::with_base_url("http://localhost:8081/", "123:abc");
        assert_eq!(
            config.method_url("getUpdates"),
            "http://localhost:8081/bot123:abc/getUpdates"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let config = BotConfig::new("123:secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_token() {
        let result = TelegramClient::connect(BotConfig::new("  ")).await;
        assert!(matches!(result, Err(TelegramError::Config(_))));
    }
}

mod type_tests {
    use super::*;

    #[test]
    fn test_text_message_update() {
        let json = r#"{
            "update_id": 1001,
            "message": {
                "message_id": 7,
                "from": {"id": 42, "is_bot": false, "first_name": "Ivan", "last_name": "Petrov", "username": "ivan_builder"},
                "chat": {"id": 42, "type": "private"},
                "date": 1700000000,
                "text": "/start"
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.update_id, 1001);
        assert_eq!(update.chat_id(), Some(42));

        let sender = update.sender().unwrap();
        assert_eq!(sender.username.as_deref(), Some("ivan_builder"));
        assert_eq!(sender.display_name().as_deref(), Some("Ivan Petrov"));
        assert_eq!(update.message.unwrap().text.as_deref(), Some("/start"));
    }

    #[test]
    fn test_location_update() {
        let json = r#"{
            "update_id": 5,
            "message": {
                "message_id": 8,
                "from": {"id": 9, "first_name": "A"},
                "chat": {"id": 9, "type": "private"},
                "location": {"latitude": 55.75, "longitude": 37.62}
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        let location = update.message.unwrap().location.unwrap();
        assert_eq!(location.latitude, 55.75);
        assert_eq!(location.longitude, 37.62);
    }

    #[test]
    fn test_callback_query_update() {
        let json = r#"{
            "update_id": 6,
            "callback_query": {
                "id": "cbq-1",
                "from": {"id": 11, "first_name": "Olga"},
                "message": {
                    "message_id": 3,
                    "chat": {"id": 11, "type": "private"}
                },
                "data": "accept:17"
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.sender().unwrap().id, 11);
        assert_eq!(update.chat_id(), Some(11));
        assert_eq!(
            update.callback_query.unwrap().data.as_deref(),
            Some("accept:17")
        );
    }

    #[test]
    fn test_error_envelope() {
        let json = r#"{"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}"#;
        let response: ApiResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.error_code, Some(403));
    }

    #[test]
    fn test_send_params_serialization() {
        let keyboard = InlineKeyboardMarkup::single_column(vec![
            InlineKeyboardButton::callback("Accept", "accept:1"),
            InlineKeyboardButton::callback("Decline", "decline:1"),
        ]);
        let params = SendMessageParams::text(42, "New offer").with_keyboard(keyboard);
        let value = serde_json::to_value(&params).unwrap();

        assert_eq!(value["chat_id"], 42);
        assert_eq!(value["reply_markup"]["inline_keyboard"][1][0]["callback_data"], "decline:1");

        let bare = SendMessageParams::text(42, "hi").with_keyboard(InlineKeyboardMarkup::default());
        let value = serde_json::to_value(&bare).unwrap();
        assert!(value.get("reply_markup").is_none());
    }

    #[test]
    fn test_forbidden_classification() {
        let err = TelegramError::Api {
            code: 403,
            description: "Forbidden".to_string(),
        };
        assert!(err.is_forbidden());
        assert!(!TelegramError::Config("x".to_string()).is_forbidden());
    }
}

// ============================================================================
// Live tests (require BOT_TOKEN)
// ============================================================================

#[tokio::test]
#[ignore]
async fn test_live_get_me() {
    let _ = dotenvy::dotenv();
    let token = std::env::var("BOT_TOKEN").expect("BOT_TOKEN must be set");

    let client = TelegramClient::connect(BotConfig::new(token)).await.unwrap();
    let me = client.me().unwrap();
    assert!(me.is_bot);
}
