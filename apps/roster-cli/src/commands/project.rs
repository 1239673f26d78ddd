use roster_remote::RemoteDirectory;

use crate::cli::{Cli, Paging};
use crate::context::setup_client;

pub async fn cmd_project_search(
    cli: &Cli,
    keyword: &str,
    paging: &Paging,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = setup_client(cli)?;

    let page = client
        .search_projects(keyword, paging.page, paging.per_page)
        .await?;

    if page.items.is_empty() {
        println!("No projects found");
        return Ok(());
    }

    println!(
        "Projects (page {} of {}, {} total):",
        paging.page,
        page.page_count(paging.per_page),
        page.total
    );
    for project in page.items {
        println!("  {:>8}  {}", project.id, project.path_with_namespace);
        if let Some(description) = project.description.filter(|d| !d.is_empty()) {
            println!("            {}", description);
        }
    }

    Ok(())
}
