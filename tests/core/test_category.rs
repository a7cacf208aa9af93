// Integration tests for the category service

use crate::common::{assert_no_open_result_sets, names, test_qname, CategoryFixture};
use taxa::core::category::{CategoryService, ChildrenFilter, Depth, Mode};
use taxa::core::index::PagingRequest;
use taxa::core::model::content::ASPECT_GEN_CLASSIFIABLE;
use taxa::core::model::{NodeRef, QName};
use taxa::core::store::NodeService;

#[test]
fn test_children_counts_by_mode_and_depth() {
    let f = CategoryFixture::new();
    let categories = &f.services.categories;
    let count = |mode, depth| {
        categories
            .get_children(Some(&f.asset_class), mode, depth)
            .expect("get_children failed")
            .len()
    };

    assert_eq!(count(Mode::Members, Depth::Immediate), 1);
    assert_eq!(count(Mode::SubCategories, Depth::Immediate), 2);
    assert_eq!(count(Mode::All, Depth::Immediate), 3);
    assert_eq!(count(Mode::Members, Depth::Any), 14);
    assert_eq!(count(Mode::SubCategories, Depth::Any), 3);
    assert_eq!(count(Mode::All, Depth::Any), 17);
    assert_no_open_result_sets(&f.services);
}

#[test]
fn test_members_of_leaf_categories() {
    let f = CategoryFixture::new();
    let categories = &f.services.categories;

    let special = categories
        .get_children(Some(&f.special_equity), Mode::Members, Depth::Immediate)
        .unwrap();
    assert_eq!(names(&f.services, &special), vec!["thirteen"]);

    let europe = categories
        .get_children(Some(&f.europe), Mode::Members, Depth::Any)
        .unwrap();
    assert_eq!(names(&f.services, &europe), vec!["three", "two"]);

    let region = categories
        .get_children(Some(&f.region), Mode::Members, Depth::Any)
        .unwrap();
    assert_eq!(region.len(), 5);

    // a category nobody references
    assert!(categories
        .get_children(Some(&f.us), Mode::All, Depth::Any)
        .unwrap()
        .is_empty());
}

#[test]
fn test_classifications_and_categories() {
    let f = CategoryFixture::new();
    let categories = &f.services.categories;
    let asset_class = test_qname("AssetClass");

    let classifications = categories.get_classifications(&f.store).unwrap();
    assert_eq!(names(&f.services, &classifications), vec!["AssetClass", "Region"]);

    assert_eq!(
        categories
            .get_categories(&f.store, &asset_class, Depth::Immediate)
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        categories
            .get_categories(&f.store, &asset_class, Depth::Any)
            .unwrap()
            .len(),
        3
    );

    let aspects = categories.get_classification_aspects();
    assert_eq!(aspects.len(), 3);
    assert!(aspects.contains(&ASPECT_GEN_CLASSIFIABLE));
    assert!(aspects.contains(&asset_class));

    let roots = categories.get_root_categories(&f.store, &asset_class).unwrap();
    assert_eq!(names(&f.services, &roots), vec!["Equity", "Fixed"]);
    assert_no_open_result_sets(&f.services);
}

#[test]
fn test_category_root_node() {
    let f = CategoryFixture::new();
    assert_eq!(
        f.services.categories.get_root_category_node(&f.store).unwrap(),
        Some(f.category_root.clone())
    );
}

#[test]
fn test_exact_and_like_filters_agree() {
    let f = CategoryFixture::new();
    let categories = &f.services.categories;

    let exact = categories
        .get_children_filtered(
            Some(&f.asset_class),
            Mode::SubCategories,
            Depth::Any,
            &ChildrenFilter::exact(["specialequity", "FIXED"]),
        )
        .unwrap();
    let like = categories
        .get_children_filtered(
            Some(&f.asset_class),
            Mode::SubCategories,
            Depth::Any,
            &ChildrenFilter::like(["Special*", "Fix?d"]),
        )
        .unwrap();

    assert_eq!(names(&f.services, &exact.page), vec!["Fixed", "SpecialEquity"]);
    assert_eq!(names(&f.services, &exact.page), names(&f.services, &like.page));
}

#[test]
fn test_exact_and_like_combined() {
    let f = CategoryFixture::new();
    let filter = ChildrenFilter {
        exact_names: vec!["Fixed".to_string()],
        like_names: vec!["Spec*".to_string()],
        ..ChildrenFilter::default()
    }
    .sorted_by_name();

    let found = f
        .services
        .categories
        .get_children_filtered(Some(&f.asset_class), Mode::SubCategories, Depth::Any, &filter)
        .unwrap();
    let found_names: Vec<String> = found
        .page
        .iter()
        .map(|a| {
            f.services
                .nodes
                .property(&a.child, &taxa::core::model::content::PROP_NAME)
                .unwrap()
                .unwrap()
                .to_text()
        })
        .collect();
    assert_eq!(found_names, vec!["Fixed", "SpecialEquity"]);
}

#[test]
fn test_paging_members() {
    let f = CategoryFixture::new();
    let filter = ChildrenFilter::default()
        .sorted_by_name()
        .with_paging(PagingRequest::new(2, 5));

    let page = f
        .services
        .categories
        .get_children_filtered(Some(&f.asset_class), Mode::Members, Depth::Any, &filter)
        .unwrap();
    assert_eq!(page.total_count, 14);
    assert_eq!(page.page.len(), 5);
    assert!(page.has_more_items);
    assert_eq!(page.skipped_stale, 0);

    let last = f
        .services
        .categories
        .get_children_filtered(
            Some(&f.asset_class),
            Mode::Members,
            Depth::Any,
            &ChildrenFilter::default().with_paging(PagingRequest::new(10, 10)),
        )
        .unwrap();
    assert_eq!(last.page.len(), 4);
    assert!(!last.has_more_items);
}

#[test]
fn test_named_root_categories() {
    let f = CategoryFixture::new();
    let categories = &f.services.categories;
    let aspect = &*ASPECT_GEN_CLASSIFIABLE;

    // the fixture has no classification node for cm:generalclassifiable
    assert!(categories
        .get_root_categories_named(&f.store, aspect, "NoSuchCategory", true)
        .unwrap()
        .is_empty());

    let asset_class = test_qname("AssetClass");
    assert!(categories
        .get_root_categories_named(&f.store, &asset_class, "NoSuchCategory", false)
        .unwrap()
        .is_empty());
    let created = categories
        .get_root_categories_named(&f.store, &asset_class, "NoSuchCategory", true)
        .unwrap();
    assert_eq!(created.len(), 1);
    for _ in 0..2 {
        let again = categories
            .get_root_categories_named(&f.store, &asset_class, "NoSuchCategory", false)
            .unwrap();
        assert_eq!(again, created);
    }
    assert_eq!(
        categories.get_root_categories(&f.store, &asset_class).unwrap().len(),
        3
    );
}

#[test]
fn test_named_roots_use_classification_namespace() {
    let f = CategoryFixture::new();
    let categories = &f.services.categories;
    let asset_class = test_qname("AssetClass");

    for create in [false, true] {
        let found = categories
            .get_root_categories_named(&f.store, &asset_class, "Fixed", create)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].child, f.fixed);
        assert_eq!(found[0].qname, Some(test_qname("Fixed")));
    }

    let bonds = categories
        .create_root_category(&f.store, &asset_class, "Bonds")
        .unwrap();
    for create in [false, true] {
        let found = categories
            .get_root_categories_named(&f.store, &asset_class, "Bonds", create)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].child, bonds);
    }

    let created = categories
        .get_root_categories_named(&f.store, &asset_class, "Cash", true)
        .unwrap();
    assert_eq!(created[0].qname, Some(test_qname("Cash")));
    assert_eq!(
        categories.get_category(&f.asset_class, &asset_class, "Cash").unwrap(),
        Some(created[0].child.clone())
    );
    assert_eq!(
        categories.get_root_categories(&f.store, &asset_class).unwrap().len(),
        4
    );
}

#[test]
fn test_create_and_delete_categories() {
    let f = CategoryFixture::new();
    let categories = &f.services.categories;
    let asset_class = test_qname("AssetClass");

    let bonds = categories
        .create_root_category(&f.store, &asset_class, "Bonds")
        .unwrap();
    let gilts = categories.create_category(&bonds, "Gilts").unwrap();
    f.services.refresh().unwrap();

    assert_eq!(
        categories.get_category(&bonds, &asset_class, "Gilts").unwrap(),
        Some(gilts.clone())
    );
    assert_eq!(
        categories
            .get_categories(&f.store, &asset_class, Depth::Immediate)
            .unwrap()
            .len(),
        3
    );
    assert_eq!(
        categories
            .get_categories(&f.store, &asset_class, Depth::Any)
            .unwrap()
            .len(),
        5
    );

    // duplicate names under one parent are rejected
    assert!(categories.create_category(&bonds, "Gilts").is_err());

    categories.delete_category(&bonds).unwrap();
    f.services.refresh().unwrap();
    assert!(!f.services.nodes.exists(&gilts));
    assert_eq!(
        categories
            .get_categories(&f.store, &asset_class, Depth::Any)
            .unwrap()
            .len(),
        3
    );
}

#[test]
fn test_stale_index_rows_are_skipped() {
    let f = CategoryFixture::new();
    // delete in the store without bringing the index up to date
    f.services.nodes.delete_node(f.member("two")).unwrap();

    let page = f
        .services
        .categories
        .get_children_filtered(
            Some(&f.fixed),
            Mode::Members,
            Depth::Immediate,
            &ChildrenFilter::default(),
        )
        .unwrap();
    assert_eq!(page.skipped_stale, 1);
    assert_eq!(page.total_count, 7);
    assert_no_open_result_sets(&f.services);
}

#[test]
fn test_top_categories() {
    let f = CategoryFixture::new();
    let top = f
        .services
        .categories
        .get_top_categories(&f.store, &test_qname("AssetClass"), 2)
        .unwrap();

    assert_eq!(top.len(), 2);
    for (node, count) in &top {
        assert!(*node == f.fixed || *node == f.equity);
        assert_eq!(*count, 8);
    }

    let aspect = test_qname("AssetClass");
    assert!(top_categories(&f, &aspect, 0).is_empty());
    assert_eq!(top_categories(&f, &aspect, 1).len(), 1);
    assert_eq!(top_categories(&f, &aspect, 10).len(), 4);
    assert_no_open_result_sets(&f.services);
}

fn top_categories(f: &CategoryFixture, aspect: &QName, count: usize) -> Vec<(NodeRef, usize)> {
    f.services
        .categories
        .get_top_categories(&f.store, aspect, count)
        .unwrap()
}

#[test]
fn test_top_categories_skip_deleted() {
    let f = CategoryFixture::new();
    // the index still counts members against the deleted category
    f.services.categories.delete_category(&f.fixed).unwrap();

    let top = top_categories(&f, &test_qname("AssetClass"), 1);
    assert_eq!(top, vec![(f.equity.clone(), 8)]);
    assert_eq!(top_categories(&f, &test_qname("AssetClass"), 10).len(), 3);
}

#[test]
fn test_classification_maintenance_is_unsupported() {
    let f = CategoryFixture::new();
    let categories = &f.services.categories;
    let sector = test_qname("Sector");

    let err = categories
        .create_classification(&f.store, &sector, "sector")
        .unwrap_err();
    assert!(err.is_unsupported());
    let err = categories
        .delete_classification(&f.store, &test_qname("AssetClass"))
        .unwrap_err();
    assert!(err.is_unsupported());
}
