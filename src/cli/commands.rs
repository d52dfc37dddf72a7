//! Command handlers for the casecrafter binary
//!
//! Every handler goes through the stores held by [`AppContext`], so the CLI
//! sees the same caching, invalidation and error bookkeeping as any other
//! front end.

use super::output::Output;
use super::{Commands, DocumentCommands, ProjectCommands, TemplateCommands};
use crate::context::AppContext;
use crate::export::ExportFormat;
use crate::polling::{PROCESSING_FAILED, ProcessingSnapshot};
use crate::services;
use crate::types::{
    AppError, Document, DocumentId, ProcessingState, ProjectDraft, Result, TimeRange,
};
use crate::upload::UploadFile;
use futures::StreamExt;
use serde::Serialize;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Dispatch one parsed command
pub async fn run(ctx: &AppContext, command: Commands, out: &Output) -> Result<()> {
    match command {
        Commands::Login { email, password } => login(ctx, &email, password, out).await,
        Commands::Register { email, name, password } => {
            let password = password_or_prompt(password, out)?;
            let user = ctx.auth.register(&email, &password, name.as_deref()).await?;
            ctx.acknowledge_login();
            out.success(&format!("Account created for {}", user.email));
            Ok(())
        }
        Commands::Logout => {
            ctx.auth.logout()?;
            ctx.projects.clear_cache();
            out.success("Signed out");
            Ok(())
        }
        Commands::Whoami => whoami(ctx, out).await,
        Commands::Projects(cmd) => projects(ctx, cmd, out).await,
        Commands::Documents(cmd) => documents(ctx, cmd, out).await,
        Commands::Generate { document, project } => generate(ctx, document, project, out).await,
        Commands::Suites { project, refresh } => suites(ctx, project, refresh, out).await,
        Commands::Matrix { project, refresh } => matrix(ctx, project, refresh, out).await,
        Commands::Export {
            suite,
            format,
            output,
            name,
        } => {
            let format: ExportFormat = format.parse()?;
            let file = ctx
                .projects
                .export_test_suite(suite, format, &output, name.as_deref())
                .await?;
            out.success(&format!(
                "Exported suite {} as {} ({} bytes)",
                suite, file.file_name, file.size
            ));
            out.kv("Path", &file.path.display().to_string());
            Ok(())
        }
        Commands::Templates(cmd) => templates(ctx, cmd, out).await,
        Commands::Analytics { range, project } => analytics(ctx, &range, project, out).await,
        Commands::Refresh { project } => {
            ctx.projects.refresh_project_data(project).await?;
            let state = ctx.projects.snapshot();
            out.success(&format!("Project {} refreshed", project));
            out.kv("Documents", &state.documents.len().to_string());
            out.kv("Test suites", &state.test_suites.len().to_string());
            if let Some(matrix) = state.traceability_matrix {
                out.kv("Coverage", &format!("{:.1}%", matrix.coverage()));
            }
            Ok(())
        }
    }
}

async fn login(ctx: &AppContext, email: &str, password: Option<String>, out: &Output) -> Result<()> {
    let password = password_or_prompt(password, out)?;
    let user = ctx.auth.login(email, &password).await?;
    ctx.acknowledge_login();
    out.success(&format!(
        "Signed in as {}",
        user.name.as_deref().unwrap_or(&user.email)
    ));
    Ok(())
}

async fn whoami(ctx: &AppContext, out: &Output) -> Result<()> {
    out.banner();
    if !ctx.bootstrap().await? {
        out.warning("Not signed in");
        out.hint("Sign in with:");
        out.command("casecrafter login <email>");
        return Ok(());
    }
    if let Some(user) = ctx.auth.user() {
        out.header("Current user");
        out.kv("Id", &user.id.to_string());
        out.kv("Email", &user.email);
        out.kv("Name", user.name.as_deref().unwrap_or("-"));
        out.kv("Verified", if user.is_verified { "yes" } else { "no" });
        out.newline();
    }
    Ok(())
}

async fn projects(ctx: &AppContext, cmd: ProjectCommands, out: &Output) -> Result<()> {
    match cmd {
        ProjectCommands::List => {
            let projects = ctx.projects.fetch_projects().await?;
            if projects.is_empty() {
                out.info("No projects yet");
                out.command("casecrafter projects create <name>");
                return Ok(());
            }
            out.header("Projects");
            out.table_header(&["ID", "Name", "Documents", "Suites"]);
            for p in &projects {
                out.table_row(&[
                    &p.id.to_string(),
                    &p.name,
                    &p.document_count.to_string(),
                    &p.test_suite_count.to_string(),
                ]);
            }
            Ok(())
        }
        ProjectCommands::Create { name, description } => {
            let project = ctx
                .projects
                .create_project(ProjectDraft { name, description })
                .await?;
            out.success(&format!("Created project {} ({})", project.name, project.id));
            Ok(())
        }
        ProjectCommands::Show { id } => {
            let project = ctx.projects.fetch_project(id).await?;
            out.header(&project.name);
            out.kv("Id", &project.id.to_string());
            out.kv("Description", project.description.as_deref().unwrap_or("-"));
            if project.is_archived {
                out.kv("Archived", "yes");
            }
            let documents = ctx.projects.fetch_documents(id, false).await?;
            print_documents(&documents, out);
            Ok(())
        }
        ProjectCommands::Delete { id, yes } => {
            if !yes && !out.confirm(&format!("Delete project {} and everything in it?", id)) {
                out.info("Aborted");
                return Ok(());
            }
            ctx.projects.delete_project(id).await?;
            out.success(&format!("Deleted project {}", id));
            Ok(())
        }
    }
}

async fn documents(ctx: &AppContext, cmd: DocumentCommands, out: &Output) -> Result<()> {
    match cmd {
        DocumentCommands::List { project, refresh } => {
            let documents = ctx.projects.fetch_documents(project, refresh).await?;
            print_documents(&documents, out);
            Ok(())
        }
        DocumentCommands::Upload { project, path, wait } => {
            let document = upload(ctx, project, &path, out).await?;
            if wait {
                follow_status(ctx, document.id, out).await?;
            } else {
                out.hint("Follow processing with:");
                out.command(&format!("casecrafter documents status {} --watch", document.id));
            }
            Ok(())
        }
        DocumentCommands::Status { document, watch } => {
            if watch {
                return follow_status(ctx, document, out).await;
            }
            let status = services::documents::status(ctx.client(), document)
                .await?
                .into_data();
            out.progress(1, &status.status.to_string(), status.progress);
            if let Some(message) = status.message {
                out.info(&message);
            }
            Ok(())
        }
        DocumentCommands::Delete { document, yes } => {
            if !yes && !out.confirm(&format!("Delete document {}?", document)) {
                out.info("Aborted");
                return Ok(());
            }
            ctx.projects.delete_document(document).await?;
            out.success(&format!("Deleted document {}", document));
            Ok(())
        }
    }
}

async fn upload(ctx: &AppContext, project: i64, path: &Path, out: &Output) -> Result<Document> {
    let file = UploadFile::from_path(path, &ctx.config().uploads).await?;
    out.info(&format!("Uploading {} ({} bytes)", file.file_name, file.size()));
    let document = ctx.projects.upload_document(project, file).await?;
    out.success(&format!(
        "Uploaded {} as document {}",
        document.filename, document.id
    ));
    Ok(document)
}

/// Poll a document's status until it finishes, printing each snapshot.
/// Ctrl-C stops the poll without an error.
async fn follow_status(ctx: &AppContext, document_id: DocumentId, out: &Output) -> Result<()> {
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let poller = ctx.poller();
    let stream = poller.watch(document_id, cancel.clone());
    futures::pin_mut!(stream);

    let mut last: Option<ProcessingSnapshot> = None;
    let mut outcome = Ok(());
    while let Some(item) = stream.next().await {
        match item {
            Ok(snapshot) => {
                out.progress(snapshot.attempt, &snapshot.state.to_string(), snapshot.progress);
                last = Some(snapshot);
            }
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    interrupt.abort();
    outcome?;

    report_processing(document_id, last, cancel.is_cancelled(), out)
}

fn report_processing(
    document_id: DocumentId,
    last: Option<ProcessingSnapshot>,
    cancelled: bool,
    out: &Output,
) -> Result<()> {
    match last {
        Some(snapshot) if snapshot.state == ProcessingState::Completed => {
            out.success(&format!("Document {} processed", document_id));
            out.hint("Generate test cases with:");
            out.command(&format!("casecrafter generate {}", document_id));
            Ok(())
        }
        Some(snapshot) if snapshot.state == ProcessingState::Failed => {
            let reason = snapshot
                .message
                .or(snapshot.error)
                .unwrap_or_else(|| PROCESSING_FAILED.to_string());
            Err(AppError::ProcessingFailed(reason))
        }
        Some(snapshot) if snapshot.state != ProcessingState::Processing => {
            out.warning(&format!(
                "Document {} is {}; the server is not processing it",
                document_id, snapshot.state
            ));
            Ok(())
        }
        _ if cancelled => {
            out.warning("Stopped following; processing continues on the server");
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn generate(ctx: &AppContext, document: DocumentId, project: Option<i64>, out: &Output) -> Result<()> {
    if let Some(project) = project {
        // Loads the owner so only that project's cached suites are dropped
        ctx.projects.fetch_documents(project, false).await?;
    }
    out.info(&format!("Generating test cases for document {}", document));
    let result = ctx.projects.generate_test_cases(document).await?;
    let suite = result.test_suite;
    out.success(&format!(
        "Created suite {} ({}) with {} test cases",
        suite.name,
        suite.id,
        suite.test_cases.len()
    ));
    for case in &suite.test_cases {
        out.list_item(&format!(
            "[{}/{}] {}",
            label(&case.test_type),
            label(&case.priority),
            case.name
        ));
    }
    Ok(())
}

async fn suites(ctx: &AppContext, project: i64, refresh: bool, out: &Output) -> Result<()> {
    let suites = ctx.projects.fetch_test_suites(project, refresh).await?;
    if suites.is_empty() {
        out.info("No test suites for this project");
        return Ok(());
    }
    out.header(&format!("Test suites of project {}", project));
    out.table_header(&["ID", "Name", "Document", "Cases"]);
    for suite in suites.iter() {
        out.table_row(&[
            &suite.id.to_string(),
            &suite.name,
            suite.document_name.as_deref().unwrap_or("-"),
            &suite.test_cases.len().to_string(),
        ]);
    }
    Ok(())
}

async fn matrix(ctx: &AppContext, project: i64, refresh: bool, out: &Output) -> Result<()> {
    let matrix = ctx.projects.fetch_traceability_matrix(project, refresh).await?;
    out.header(&format!("Traceability of project {}", project));
    out.kv("Requirements", &matrix.requirements.len().to_string());
    out.kv("Test cases", &matrix.test_cases.len().to_string());
    out.kv("Coverage", &format!("{:.1}%", matrix.coverage()));

    for requirement in &matrix.requirements {
        let tests = matrix.tests_for(requirement.id);
        out.subheader(&format!("R{} {}", requirement.id, requirement.original_text));
        if tests.is_empty() {
            out.warning("not covered");
        }
        for tc in tests {
            out.list_item(&format!("#{} {}", tc.id, tc.name));
        }
    }
    Ok(())
}

async fn templates(ctx: &AppContext, cmd: TemplateCommands, out: &Output) -> Result<()> {
    match cmd {
        TemplateCommands::List { category } => {
            let templates = ctx.templates.fetch_templates(category.as_deref()).await?;
            print_templates(&templates, out);
            Ok(())
        }
        TemplateCommands::Popular { limit } => {
            ctx.templates.fetch_templates(None).await?;
            print_templates(&ctx.templates.popular_templates(limit), out);
            Ok(())
        }
        TemplateCommands::Search { query, category } => {
            let templates = ctx
                .templates
                .search_templates(&query, category.as_deref())
                .await?;
            print_templates(&templates, out);
            Ok(())
        }
        TemplateCommands::Apply { template, project } => {
            let applied = ctx.apply_template(template, project).await?;
            out.success(&format!(
                "Applied template {} to project {} ({} test cases created)",
                applied.template_id, applied.project_id, applied.test_cases_created
            ));
            Ok(())
        }
    }
}

async fn analytics(ctx: &AppContext, range: &str, project: Option<i64>, out: &Output) -> Result<()> {
    let range: TimeRange = range.parse()?;
    if let Some(project) = project {
        let report = ctx.analytics.fetch_project_analytics(project, range).await?;
        out.header(&format!("{} ({})", report.project_name, range));
        out.kv("Documents", &report.documents_count.to_string());
        out.kv("Test suites", &report.test_suites_count.to_string());
        out.kv("Test cases", &report.test_cases_count.to_string());
        return Ok(());
    }

    let report = ctx.analytics.fetch_analytics(range).await?;
    out.header(&format!("Analytics ({})", range));
    out.kv("Projects", &report.total_projects.to_string());
    out.kv("Documents analyzed", &report.documents_analyzed.to_string());
    out.kv("Test cases generated", &report.test_cases_generated.to_string());
    out.kv("Avg processing time", &format!("{:.1}s", report.avg_processing_time));
    if !report.test_cases_by_type.is_empty() {
        out.subheader("Test cases by type");
        for (kind, count) in &report.test_cases_by_type {
            out.kv(kind, &count.to_string());
        }
    }
    if !report.recent_activity.is_empty() {
        out.subheader("Recent activity");
        for activity in report.recent_activity.iter().take(10) {
            out.list_item(&format!("{} {}", activity.timestamp, activity.description));
        }
    }
    out.newline();
    Ok(())
}

fn print_documents(documents: &[Document], out: &Output) {
    if documents.is_empty() {
        out.info("No documents");
        return;
    }
    out.subheader("Documents");
    out.table_header(&["ID", "File", "Status", "Size"]);
    for doc in documents {
        out.table_row(&[
            &doc.id.to_string(),
            &doc.filename,
            &label(&doc.status),
            &doc.file_size.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
        ]);
    }
}

fn print_templates(templates: &[crate::types::Template], out: &Output) {
    if templates.is_empty() {
        out.info("No templates found");
        return;
    }
    out.header("Templates");
    out.table_header(&["ID", "Name", "Category", "Uses"]);
    for t in templates {
        out.table_row(&[
            &t.id.to_string(),
            &t.name,
            &t.category,
            &t.usage_count.to_string(),
        ]);
    }
}

fn password_or_prompt(password: Option<String>, out: &Output) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => out
            .prompt("Password")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::InvalidInput("A password is required".to_string())),
    }
}

/// Wire name of a serde enum value, e.g. `positive` for `TestType::Positive`
fn label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentStatus, Priority, TestType};

    #[test]
    fn test_label_uses_wire_names() {
        assert_eq!(label(&TestType::Security), "security");
        assert_eq!(label(&Priority::High), "high");
        assert_eq!(label(&DocumentStatus::Processed), "processed");
    }

    #[test]
    fn test_password_flag_skips_prompt() {
        let out = Output::no_color();
        assert_eq!(
            password_or_prompt(Some("s3cret".to_string()), &out).unwrap(),
            "s3cret"
        );
    }

    fn snapshot(state: ProcessingState, message: Option<&str>) -> ProcessingSnapshot {
        ProcessingSnapshot {
            document_id: 12,
            state,
            progress: 100,
            message: message.map(str::to_string),
            error: None,
            attempt: 1,
        }
    }

    #[test]
    fn test_failed_processing_is_its_own_error() {
        let out = Output::no_color();
        let err = report_processing(
            12,
            Some(snapshot(ProcessingState::Failed, Some("OCR error"))),
            false,
            &out,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::ProcessingFailed(ref reason) if reason == "OCR error"));
        assert_eq!(err.status(), None);
        assert_eq!(err.user_message(), "OCR error");
    }

    #[test]
    fn test_other_end_states_are_not_errors() {
        let out = Output::no_color();
        for state in [ProcessingState::Completed, ProcessingState::Uploaded, ProcessingState::Unknown] {
            assert!(report_processing(12, Some(snapshot(state, None)), false, &out).is_ok());
        }
        assert!(report_processing(12, None, true, &out).is_ok());
    }
}
