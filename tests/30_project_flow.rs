mod common;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

// End-to-end flows against a live database. Each test registers its own
// users and creates its own data; they skip cleanly when the spawned
// server reports a degraded health check.

#[tokio::test]
async fn admin_project_lifecycle() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await? {
        eprintln!("skipping admin_project_lifecycle: database unavailable");
        return Ok(());
    }

    let client = Client::new();
    let base = &server.base_url;
    let (admin_token, _) = common::register_user(&client, base, "Lifecycle Admin", true).await?;

    // Reversed dates are rejected
    let resp = client
        .post(format!("{}/api/projects", base))
        .bearer_auth(&admin_token)
        .json(&json!({
            "name": "Backwards",
            "description": "d",
            "startDate": "2024-01-10",
            "endDate": "2024-01-01",
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "End date must be after start date");

    // Create applies the documented defaults
    let resp = client
        .post(format!("{}/api/projects", base))
        .bearer_auth(&admin_token)
        .json(&json!({
            "name": "X",
            "description": "d",
            "startDate": "2024-01-01",
            "endDate": "2024-01-10",
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await?;
    assert_eq!(body["success"], true);
    let project = &body["data"];
    assert_eq!(project["status"], "Planning");
    assert_eq!(project["priority"], "Medium");
    assert_eq!(project["budget"], 0.0);
    assert_eq!(project["progress"], 0);
    let project_id = project["id"].as_str().unwrap().to_string();

    // Two tasks under the project
    let mut task_ids = Vec::new();
    for title in ["first", "second"] {
        let resp = client
            .post(format!("{}/api/tasks", base))
            .bearer_auth(&admin_token)
            .json(&json!({
                "title": title,
                "dueDate": "2024-02-01",
                "project": project_id,
            }))
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await?;
        task_ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    // Delete is blocked while tasks reference the project
    let resp = client
        .delete(format!("{}/api/projects/{}", base, project_id))
        .bearer_auth(&admin_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await?;
    assert_eq!(
        body["message"],
        "Cannot delete project. It has 2 task(s). Please delete or reassign tasks first."
    );

    // Detail view carries the task list and the four-way stats
    let resp = client
        .get(format!("{}/api/projects/{}", base, project_id))
        .bearer_auth(&admin_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["data"]["tasks"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["taskStats"]["total"], 2);
    assert_eq!(body["data"]["taskStats"]["pending"], 2);

    // Complete one task, stats land on 50%
    let resp = client
        .put(format!("{}/api/tasks/{}/status", base, task_ids[0]))
        .bearer_auth(&admin_token)
        .json(&json!({ "status": "Completed" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{}/api/projects/{}/stats", base, project_id))
        .bearer_auth(&admin_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["data"]["totalTasks"], 2);
    assert_eq!(body["data"]["completedTasks"], 1);
    assert_eq!(body["data"]["completionPercentage"], 50);

    // budget: 0 is a real update, not "field absent"
    let resp = client
        .put(format!("{}/api/projects/{}", base, project_id))
        .bearer_auth(&admin_token)
        .json(&json!({ "budget": 2500.0 }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = client
        .put(format!("{}/api/projects/{}", base, project_id))
        .bearer_auth(&admin_token)
        .json(&json!({ "budget": 0.0 }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["data"]["budget"], 0.0);
    // Untouched fields survive the merge
    assert_eq!(body["data"]["name"], "X");

    // After removing the tasks the delete goes through
    for task_id in &task_ids {
        let resp = client
            .delete(format!("{}/api/tasks/{}", base, task_id))
            .bearer_auth(&admin_token)
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = client
        .delete(format!("{}/api/projects/{}", base, project_id))
        .bearer_auth(&admin_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "Project deleted successfully");

    // And the project is gone
    let resp = client
        .get(format!("{}/api/projects/{}", base, project_id))
        .bearer_auth(&admin_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn member_visibility_follows_team_membership() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await? {
        eprintln!("skipping member_visibility_follows_team_membership: database unavailable");
        return Ok(());
    }

    let client = Client::new();
    let base = &server.base_url;
    let (admin_token, _) = common::register_user(&client, base, "Visibility Admin", true).await?;
    let (member_token, member_id) =
        common::register_user(&client, base, "Visibility Member", false).await?;

    // Three projects; the member is on the team of exactly one
    let mut project_ids = Vec::new();
    for (name, on_team) in [("alpha", false), ("beta", true), ("gamma", false)] {
        let mut payload = json!({
            "name": name,
            "description": "d",
            "startDate": "2024-01-01",
            "endDate": "2024-06-30",
        });
        if on_team {
            payload["teamMembers"] = json!([member_id]);
        }
        let resp = client
            .post(format!("{}/api/projects", base))
            .bearer_auth(&admin_token)
            .json(&payload)
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await?;
        project_ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    // The member's listing is exactly the one project, stats attached
    let resp = client
        .get(format!("{}/api/projects", base))
        .bearer_auth(&member_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["count"], 1);
    let listed = &body["data"][0];
    assert_eq!(listed["id"].as_str().unwrap(), project_ids[1]);
    assert_eq!(listed["taskStats"]["total"], 0);

    // Admin sees all three among the full listing
    let resp = client
        .get(format!("{}/api/projects", base))
        .bearer_auth(&admin_token)
        .send()
        .await?;
    let body: Value = resp.json().await?;
    let admin_ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    for id in &project_ids {
        assert!(admin_ids.contains(&id.as_str()));
    }

    // Off-team project: detail, tasks and stats all deny with 403
    for path in [
        format!("/api/projects/{}", project_ids[0]),
        format!("/api/projects/{}/tasks", project_ids[0]),
        format!("/api/projects/{}/stats", project_ids[0]),
    ] {
        let resp = client
            .get(format!("{}{}", base, path))
            .bearer_auth(&member_token)
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "expected 403 for {}", path);
    }

    // On-team project reads succeed
    let resp = client
        .get(format!("{}/api/projects/{}", base, project_ids[1]))
        .bearer_auth(&member_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // Members cannot manage projects at all
    let resp = client
        .post(format!("{}/api/projects", base))
        .bearer_auth(&member_token)
        .json(&json!({
            "name": "nope",
            "description": "d",
            "startDate": "2024-01-01",
            "endDate": "2024-01-02",
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = client
        .delete(format!("{}/api/projects/{}", base, project_ids[1]))
        .bearer_auth(&member_token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    Ok(())
}
