use crate::aliases::Action;
use crate::handler::Error;
use crate::tests::helper;
use crate::tests::helper::ROOT;

#[tokio::test]
async fn test_custom_alias() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;

    let alias = handler
        .create_custom_url_alias(42, "/promo/summer/", false, None, false)
        .await
        .unwrap();
    assert_eq!("promo/summer", alias.path);
    assert!(alias.is_custom);
    assert!(!alias.forward);
    assert_eq!(vec!["eng-GB".to_string()], alias.language_codes);

    let found = handler.lookup("promo/summer", &helper::eng()).await.unwrap();
    assert_eq!(Action::Location(42), found.destination);
    assert!(found.is_custom);

    // intermediate elements are placeholders only
    let result = handler.lookup("promo", &helper::eng()).await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    let custom = handler
        .list_url_aliases_for_location(42, true, &[])
        .await
        .unwrap();
    assert_eq!(vec![alias], custom);

    let autogenerated = handler
        .list_url_aliases_for_location(42, false, &[])
        .await
        .unwrap();
    assert_eq!(1, autogenerated.len());
    assert_eq!("Products", autogenerated[0].path);
}

#[tokio::test]
async fn test_custom_alias_forwarding() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;

    handler
        .create_custom_url_alias(42, "deals", true, Some("eng-GB"), false)
        .await
        .unwrap();

    let found = handler.lookup("deals", &helper::eng()).await.unwrap();
    assert!(found.forward);
    assert!(found.needs_redirect());

    let target = handler.redirect_path(&found, &helper::eng()).await.unwrap();
    assert_eq!(Some("Products".to_string()), target);
}

#[tokio::test]
async fn test_custom_alias_existing_path() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;
    handler.create_location(43, ROOT).await.unwrap();

    let result = handler
        .create_custom_url_alias(43, "products", false, None, false)
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));

    // same target, same language
    handler
        .create_custom_url_alias(42, "promo", false, None, false)
        .await
        .unwrap();
    let result = handler
        .create_custom_url_alias(42, "promo", false, None, false)
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
}

#[tokio::test]
async fn test_custom_alias_adds_language() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;

    handler
        .create_custom_url_alias(42, "promo", false, Some("eng-GB"), false)
        .await
        .unwrap();
    let alias = handler
        .create_custom_url_alias(42, "promo", false, Some("ger-DE"), false)
        .await
        .unwrap();
    assert_eq!(
        vec!["eng-GB".to_string(), "ger-DE".to_string()],
        alias.language_codes
    );

    let found = handler.lookup("promo", &helper::ger()).await.unwrap();
    assert_eq!(Action::Location(42), found.destination);
}

#[tokio::test]
async fn test_custom_alias_below_location_alias() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;
    handler.create_location(43, ROOT).await.unwrap();

    let alias = handler
        .create_custom_url_alias(43, "products/special", false, None, false)
        .await
        .unwrap();
    assert_eq!("Products/special", alias.path);

    let found = handler
        .lookup("products/special", &helper::eng())
        .await
        .unwrap();
    assert_eq!(Action::Location(43), found.destination);
}

#[tokio::test]
async fn test_lookup_through_custom_location_alias() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;
    helper::publish_location(&handler, 43, 42, "Shoes").await;

    handler
        .create_custom_url_alias(42, "shop", false, None, false)
        .await
        .unwrap();

    let found = handler.lookup("shop/shoes", &helper::eng()).await.unwrap();
    assert_eq!(Action::Location(43), found.destination);
    assert_eq!("Products/Shoes", found.path);
}

#[tokio::test]
async fn test_custom_alias_takes_over_placeholder() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;
    helper::publish_location(&handler, 43, ROOT, "Contact").await;

    handler
        .create_custom_url_alias(42, "promo/summer", false, None, false)
        .await
        .unwrap();
    handler
        .create_custom_url_alias(43, "promo", false, None, false)
        .await
        .unwrap();

    let promo = handler.lookup("promo", &helper::eng()).await.unwrap();
    assert_eq!(Action::Location(43), promo.destination);

    let summer = handler.lookup("promo/summer", &helper::eng()).await.unwrap();
    assert_eq!(Action::Location(42), summer.destination);
}

#[tokio::test]
async fn test_custom_alias_errors() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;

    let result = handler
        .create_custom_url_alias(42, " / ", false, None, false)
        .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    let result = handler
        .create_custom_url_alias(99, "promo", false, None, false)
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    let result = handler
        .create_custom_url_alias(42, "promo", false, Some("fre-FR"), false)
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_global_alias() {
    let handler = helper::setup_handler().await;

    let alias = handler
        .create_global_url_alias("module:content/search", "search", false, None, true)
        .await
        .unwrap();
    assert!(alias.is_custom);
    assert!(alias.always_available);

    let found = handler.lookup("search", &helper::ger()).await.unwrap();
    assert_eq!(
        Action::Resource("module:content/search".to_string()),
        found.destination
    );

    let all = handler.list_global_url_aliases(None, 0, None).await.unwrap();
    assert_eq!(vec![alias.clone()], all);

    let german = handler
        .list_global_url_aliases(Some("ger-DE"), 0, None)
        .await
        .unwrap();
    assert_eq!(1, german.len());

    let paged = handler
        .list_global_url_aliases(None, 1, Some(10))
        .await
        .unwrap();
    assert!(paged.is_empty());

    let result = handler
        .create_global_url_alias("eznode:42", "search2", false, None, true)
        .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    let result = handler.list_global_url_aliases(Some("fre-FR"), 0, None).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_global_alias_forwarding() {
    let handler = helper::setup_handler().await;

    handler
        .create_global_url_alias("module:content/search", "find", true, None, true)
        .await
        .unwrap();

    let found = handler.lookup("find", &helper::eng()).await.unwrap();
    let target = handler.redirect_path(&found, &helper::eng()).await.unwrap();
    assert_eq!(Some("content/search".to_string()), target);
}

#[tokio::test]
async fn test_remove_url_aliases() {
    let handler = helper::setup_handler().await;

    let autogenerated = helper::publish_location(&handler, 42, ROOT, "Products").await;
    let custom = handler
        .create_custom_url_alias(42, "promo", false, None, false)
        .await
        .unwrap();

    assert!(handler.remove_url_aliases(&[custom.clone()]).await.unwrap());

    let result = handler.lookup("promo", &helper::eng()).await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    // already removed
    assert!(!handler.remove_url_aliases(&[custom]).await.unwrap());

    // autogenerated aliases are skipped
    assert!(!handler.remove_url_aliases(&[autogenerated]).await.unwrap());
    assert!(handler.lookup("products", &helper::eng()).await.is_ok());

    // the path can be used again
    let again = handler
        .create_custom_url_alias(42, "promo", false, None, false)
        .await
        .unwrap();
    assert_eq!("promo", again.path);
}

#[tokio::test]
async fn test_custom_alias_below_other_language() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;
    handler.create_location(50, ROOT).await.unwrap();

    let alias = handler
        .create_custom_url_alias(50, "products/angebot", false, Some("ger-DE"), false)
        .await
        .unwrap();

    let found = handler
        .lookup("products/angebot", &helper::ger())
        .await
        .unwrap();
    assert_eq!(Action::Location(50), found.destination);
    assert_eq!(alias.id, found.id);

    // the leaf still has to match
    let result = handler.lookup("products/angebot", &helper::eng()).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_custom_alias_below_deleted_location() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;
    handler.create_location(50, ROOT).await.unwrap();

    handler.location_deleted(42).await.unwrap();

    let alias = handler
        .create_custom_url_alias(50, "products/angebot", false, Some("ger-DE"), false)
        .await
        .unwrap();
    assert_eq!("Products/angebot", alias.path);

    let found = handler
        .lookup("products/angebot", &helper::ger())
        .await
        .unwrap();
    assert_eq!(Action::Location(50), found.destination);

    // the placeholder itself is no result
    let result = handler.lookup("products", &helper::ger()).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}
