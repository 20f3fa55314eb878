use crate::aliases::Action;
use crate::handler::Error;
use crate::tests::helper;
use crate::tests::helper::ROOT;

#[tokio::test]
async fn test_lookup_prioritized_languages() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;
    handler
        .publish_url_alias_for_location(42, "Produkte", "ger-DE", false)
        .await
        .unwrap();
    helper::publish_location(&handler, 43, 42, "Shoes").await;

    let german = handler.lookup("produkte", &helper::ger()).await.unwrap();
    assert_eq!("Produkte", german.path);
    assert_eq!(vec!["ger-DE".to_string()], german.language_codes);

    // the last segment must match a wanted language
    let result = handler.lookup("produkte/shoes", &helper::ger()).await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    let prioritized = vec!["ger-DE".to_string(), "eng-GB".to_string()];
    let child = handler
        .lookup("produkte/shoes", &prioritized)
        .await
        .unwrap();
    assert_eq!(Action::Location(43), child.destination);
    assert_eq!("Produkte/Shoes", child.path);

    let english = handler.lookup("products/shoes", &helper::eng()).await.unwrap();
    assert_eq!("Products/Shoes", english.path);

    let aliases = handler.reverse_lookup(42, &prioritized).await.unwrap();
    assert_eq!(2, aliases.len());

    let aliases = handler.reverse_lookup(42, &helper::ger()).await.unwrap();
    assert_eq!(1, aliases.len());
    assert_eq!("Produkte", aliases[0].path);
}

#[tokio::test]
async fn test_lookup_ignores_empty_segments() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;
    helper::publish_location(&handler, 43, 42, "Shoes").await;

    let found = handler
        .lookup("//products//shoes/", &helper::eng())
        .await
        .unwrap();
    assert_eq!(Action::Location(43), found.destination);
}

#[tokio::test]
async fn test_lookup_unknown() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;

    for path in ["unknown", "products/unknown", "unknown/products"] {
        let result = handler.lookup(path, &helper::eng()).await;
        assert!(matches!(result, Err(Error::NotFound(_))), "{path}");
    }
}

#[tokio::test]
async fn test_lookup_unicode() {
    let handler = helper::setup_handler().await;

    let alias = helper::publish_location(&handler, 42, ROOT, "Über uns").await;
    assert_eq!("Über-uns", alias.path);

    let found = handler.lookup("über-UNS", &helper::eng()).await.unwrap();
    assert_eq!(Action::Location(42), found.destination);
}

#[tokio::test]
async fn test_load_url_alias() {
    let handler = helper::setup_handler().await;

    let alias = helper::publish_location(&handler, 42, ROOT, "Products").await;

    let loaded = handler.load_url_alias(&alias.id).await.unwrap();
    assert_eq!(alias, loaded);

    let result = handler.load_url_alias("not-an-id").await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    let result = handler
        .load_url_alias("0-00000000000000000000000000000000")
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_list_aliases_languages() {
    let handler = helper::setup_handler().await;

    helper::publish_location(&handler, 42, ROOT, "Products").await;
    handler
        .publish_url_alias_for_location(42, "Produkte", "ger-DE", false)
        .await
        .unwrap();

    let all = handler
        .list_url_aliases_for_location(42, false, &[])
        .await
        .unwrap();
    assert_eq!(2, all.len());

    let german = handler
        .list_url_aliases_for_location(42, false, &helper::ger())
        .await
        .unwrap();
    assert_eq!(1, german.len());
    assert_eq!("Produkte", german[0].path);

    let result = handler.list_url_aliases_for_location(99, false, &[]).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}
