mod common;

use common::MockGrid;
use onboarding::provision::{FailurePoint, ProvisionError, SchemaProvisioner};
use quill_grid::GridClient;
use quill_schema::catalog;
use std::sync::Arc;

fn provisioner_for(grid: &MockGrid) -> SchemaProvisioner {
    let client = GridClient::new(&grid.grid_config()).expect("grid client");
    SchemaProvisioner::new(Arc::new(client), Arc::new(catalog::builtin()))
}

#[tokio::test]
async fn provisions_every_table_and_field_in_declared_order() {
    let grid = MockGrid::spawn().await;
    let provisioner = provisioner_for(&grid);

    let result = provisioner
        .provision("acme", "Acme Media")
        .await
        .expect("provision");

    assert_eq!(result.tenant_id, "acme");
    assert_eq!(result.workspace_id, 101);
    assert_eq!(result.database_token_key, "grid-key-101");
    assert_eq!(result.schema_version, 1);
    assert_eq!(result.tables.len(), 7);

    // Every declared field has a remote id, link fields included.
    let schema = catalog::builtin();
    for table in &schema.tables {
        for field in &table.fields {
            assert!(
                result.field_id(&table.key, &field.name).is_some(),
                "missing id for {}.{}",
                table.key,
                field.name
            );
        }
    }

    let state = grid.state.lock().await;
    assert_eq!(
        state.table_creates,
        vec![
            "Campaigns",
            "Channels",
            "Content Ideas",
            "Content Posts",
            "Assets",
            "Publications",
            "Channel Metrics"
        ]
    );
    // 30 scalar fields first, then the 8 link fields once every table exists.
    assert_eq!(state.field_creates.len(), 38);
    let first_link = state
        .field_creates
        .iter()
        .position(|(_, _, kind)| kind == "link_row")
        .expect("link creates");
    assert_eq!(first_link, 30);

    // Within a table, fields arrive in declared order.
    let campaign_fields: Vec<&str> = state
        .field_creates
        .iter()
        .filter(|(table_id, _, _)| *table_id == 201)
        .map(|(_, name, _)| name.as_str())
        .collect();
    assert_eq!(
        campaign_fields,
        vec!["Name", "Objective", "Status", "Start Date", "End Date", "Budget"]
    );

    assert!(state.deleted_tables.is_empty());
}

#[tokio::test]
async fn failed_field_create_rolls_back_in_reverse_order() {
    let grid = MockGrid::spawn().await;
    {
        let mut state = grid.state.lock().await;
        state.fail_field_on = Some(("Assets".to_string(), "Kind".to_string()));
    }
    let provisioner = provisioner_for(&grid);

    let err = provisioner
        .provision("acme", "Acme Media")
        .await
        .expect_err("field create fails");
    let ProvisionError::Create {
        tenant_id,
        point,
        rolled_back,
        ..
    } = err
    else {
        panic!("expected create error, got {err:?}");
    };
    assert_eq!(tenant_id, "acme");
    assert_eq!(point, FailurePoint::field("assets", "Kind"));
    assert_eq!(rolled_back, vec![205, 204, 203, 202, 201]);

    let state = grid.state.lock().await;
    // Tables after the failure point were never attempted.
    assert_eq!(state.table_creates.len(), 5);
    assert_eq!(state.deleted_tables, vec![205, 204, 203, 202, 201]);
    assert!(state.tables.is_empty());
}

#[tokio::test]
async fn failed_table_create_names_the_table() {
    let grid = MockGrid::spawn().await;
    {
        let mut state = grid.state.lock().await;
        state.fail_table_create = Some("Content Posts".to_string());
    }
    let provisioner = provisioner_for(&grid);

    let err = provisioner
        .provision("acme", "Acme Media")
        .await
        .expect_err("table create fails");
    let ProvisionError::Create {
        point, rolled_back, ..
    } = err
    else {
        panic!("expected create error, got {err:?}");
    };
    assert_eq!(point, FailurePoint::table("content_posts"));
    assert_eq!(rolled_back, vec![203, 202, 201]);
}

#[tokio::test]
async fn failed_rollback_reports_orphaned_tables() {
    let grid = MockGrid::spawn().await;
    {
        let mut state = grid.state.lock().await;
        state.fail_field_on = Some(("Assets".to_string(), "Kind".to_string()));
        state.fail_delete_of = Some("Channels".to_string());
    }
    let provisioner = provisioner_for(&grid);

    let err = provisioner
        .provision("acme", "Acme Media")
        .await
        .expect_err("rollback fails");
    let ProvisionError::Rollback(rollback) = err else {
        panic!("expected rollback error, got {err:?}");
    };
    assert_eq!(rollback.tenant_id, "acme");
    assert_eq!(rollback.point, FailurePoint::field("assets", "Kind"));
    assert_eq!(rollback.orphaned_table_ids, vec![202]);
    // Deletes continue past the failure; everything else is cleaned up.
    assert_eq!(rollback.deleted_table_ids, vec![205, 204, 203, 201]);

    let state = grid.state.lock().await;
    assert_eq!(state.tables.len(), 1);
    assert!(state.tables.contains_key(&202));
}

#[tokio::test]
async fn link_failure_retains_tables_and_repair_finishes_the_job() {
    let grid = MockGrid::spawn().await;
    {
        let mut state = grid.state.lock().await;
        state.fail_field_on = Some(("Publications".to_string(), "Channel".to_string()));
    }
    let provisioner = provisioner_for(&grid);

    let err = provisioner
        .provision("acme", "Acme Media")
        .await
        .expect_err("linking fails");
    let ProvisionError::Link { result, point, .. } = err else {
        panic!("expected link error, got {err:?}");
    };
    assert_eq!(point, FailurePoint::field("publications", "Channel"));
    assert_eq!(result.tables.len(), 7);
    // Link fields created before the failure are recorded; the failed one
    // and everything after it are not.
    assert!(result.field_id("ideas", "Campaign").is_some());
    assert!(result.field_id("publications", "Post").is_some());
    assert!(result.field_id("publications", "Channel").is_none());
    assert!(result.field_id("metrics", "Publication").is_none());
    {
        let state = grid.state.lock().await;
        assert!(state.deleted_tables.is_empty());
        assert_eq!(state.tables.len(), 7);
    }

    // Clear the fault and repair. Only the three missing link fields may be
    // created; the five that exist are adopted by name.
    let creates_before = { grid.state.lock().await.field_creates.len() };
    {
        grid.state.lock().await.fail_field_on = None;
    }
    let repaired = provisioner.repair_links(*result).await.expect("repair");
    let schema = catalog::builtin();
    for table in &schema.tables {
        for field in &table.fields {
            assert!(
                repaired.field_id(&table.key, &field.name).is_some(),
                "missing id for {}.{}",
                table.key,
                field.name
            );
        }
    }
    let creates_after = { grid.state.lock().await.field_creates.len() };
    assert_eq!(creates_after - creates_before, 3);

    // A second repair changes nothing remotely.
    let again = provisioner
        .repair_links(repaired)
        .await
        .expect("idempotent repair");
    assert_eq!(again.tables.len(), 7);
    let creates_final = { grid.state.lock().await.field_creates.len() };
    assert_eq!(creates_final, creates_after);
}

#[tokio::test]
async fn auth_failure_creates_nothing() {
    let grid = MockGrid::spawn().await;
    {
        grid.state.lock().await.fail_auth = true;
    }
    let provisioner = provisioner_for(&grid);

    let err = provisioner
        .provision("acme", "Acme Media")
        .await
        .expect_err("auth fails");
    assert!(matches!(err, ProvisionError::Auth(_)));

    let state = grid.state.lock().await;
    assert_eq!(state.workspace_calls, 0);
    assert!(state.table_creates.is_empty());
    assert!(state.field_creates.is_empty());
}

#[tokio::test]
async fn token_mint_failure_leaves_no_tables_to_roll_back() {
    let grid = MockGrid::spawn().await;
    {
        grid.state.lock().await.fail_token_create = true;
    }
    let provisioner = provisioner_for(&grid);

    let err = provisioner
        .provision("acme", "Acme Media")
        .await
        .expect_err("token mint fails");
    assert!(matches!(err, ProvisionError::Setup { .. }));

    let state = grid.state.lock().await;
    // The workspace shell exists but no tables were created or deleted.
    assert_eq!(state.workspace_calls, 1);
    assert!(state.table_creates.is_empty());
    assert!(state.deleted_tables.is_empty());
}
