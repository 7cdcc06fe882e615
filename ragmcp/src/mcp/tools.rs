//! MCP tool handlers for ragmcp
//!
//! Each tool handler validates its arguments, talks to the capabilities in
//! [`AppContext`] and returns text. Tool-level failures never become JSON-RPC
//! errors: they are reported as text inside a successful result.

use super::protocol::{ToolDefinition, ToolResult};
use crate::chunker::{
    Chunker, CHUNK_INDEX_KEY, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, TOTAL_CHUNKS_KEY,
};
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::store::{Document, Metadata, ScoredDocument};
use serde_json::{json, Value};

/// Default number of documents retrieved by search and RAG
pub const DEFAULT_K: usize = 4;

/// Default answer language for `rag_query`
pub const DEFAULT_LANGUAGE: &str = "ko";

/// Tools exposed by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    AddDocuments,
    SearchDocuments,
    RagQuery,
    GetCollectionInfo,
    DeleteCollection,
}

impl Tool {
    /// Every tool, in catalog order
    pub const ALL: [Tool; 5] = [
        Tool::AddDocuments,
        Tool::SearchDocuments,
        Tool::RagQuery,
        Tool::GetCollectionInfo,
        Tool::DeleteCollection,
    ];

    /// Wire name of the tool
    pub fn name(&self) -> &'static str {
        match self {
            Tool::AddDocuments => "add_documents",
            Tool::SearchDocuments => "search_documents",
            Tool::RagQuery => "rag_query",
            Tool::GetCollectionInfo => "get_collection_info",
            Tool::DeleteCollection => "delete_collection",
        }
    }

    /// Look a tool up by wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Tool::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Descriptor listed by `tools/list`
    pub fn definition(&self) -> ToolDefinition {
        let (description, input_schema) = match self {
            Tool::AddDocuments => (
                "Add documents to the vector database with automatic chunking and embedding.",
                json!({
                    "type": "object",
                    "properties": {
                        "texts": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Array of document texts to add"
                        },
                        "metadatas": {
                            "type": "array",
                            "items": {"type": "object"},
                            "description": "Optional array of metadata objects"
                        },
                        "chunk_size": {
                            "type": "integer",
                            "description": "Chunk size (default: 1000)",
                            "default": DEFAULT_CHUNK_SIZE
                        },
                        "chunk_overlap": {
                            "type": "integer",
                            "description": "Chunk overlap (default: 200)",
                            "default": DEFAULT_CHUNK_OVERLAP
                        }
                    },
                    "required": ["texts"]
                }),
            ),
            Tool::SearchDocuments => (
                "Search for similar documents in the vector database.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search query"
                        },
                        "k": {
                            "type": "integer",
                            "description": "Number of results (default: 4)",
                            "default": DEFAULT_K
                        }
                    },
                    "required": ["query"]
                }),
            ),
            Tool::RagQuery => (
                "Answer questions using RAG with Claude AI.",
                json!({
                    "type": "object",
                    "properties": {
                        "question": {
                            "type": "string",
                            "description": "Question to answer"
                        },
                        "k": {
                            "type": "integer",
                            "description": "Number of documents to retrieve (default: 4)",
                            "default": DEFAULT_K
                        },
                        "language": {
                            "type": "string",
                            "description": "Response language (ko/en, default: ko)",
                            "default": DEFAULT_LANGUAGE
                        }
                    },
                    "required": ["question"]
                }),
            ),
            Tool::GetCollectionInfo => (
                "Get information about the current collection.",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
            Tool::DeleteCollection => (
                "Delete the entire collection (WARNING: irreversible).",
                json!({
                    "type": "object",
                    "properties": {
                        "confirm": {
                            "type": "boolean",
                            "description": "Must be true to confirm deletion"
                        }
                    },
                    "required": ["confirm"]
                }),
            ),
        };

        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Get all tool definitions
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    Tool::ALL.iter().map(Tool::definition).collect()
}

/// Handle tool call dispatch.
///
/// Always produces a result: unknown tools and handler failures are
/// described in the result text.
pub async fn handle_tool_call(
    ctx: &AppContext,
    tool_name: Option<&str>,
    arguments: &Value,
) -> ToolResult {
    let Some(tool) = tool_name.and_then(Tool::from_name) else {
        tracing::warn!("Unknown tool requested: {:?}", tool_name);
        return ToolResult::text(format!("Unknown tool: {}", tool_name.unwrap_or("(none)")));
    };

    tracing::debug!("Calling tool {}", tool.name());

    let outcome = match tool {
        Tool::AddDocuments => tool_add_documents(ctx, arguments).await,
        Tool::SearchDocuments => tool_search_documents(ctx, arguments).await,
        Tool::RagQuery => tool_rag_query(ctx, arguments).await,
        Tool::GetCollectionInfo => Ok(tool_get_collection_info(ctx).await),
        Tool::DeleteCollection => Ok(tool_delete_collection(ctx, arguments).await),
    };

    outcome.unwrap_or_else(|e| match e {
        Error::ToolArgument(detail) => ToolResult::text(format!("Error: {}", detail)),
        e => {
            tracing::warn!("Tool {} failed: {}", tool.name(), e);
            ToolResult::text(format!("Error executing {}: {}", tool.name(), e))
        }
    })
}

/// Optional non-negative integer argument, `default` when absent or null
fn get_usize(args: &Value, key: &str, default: usize) -> Result<usize> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| Error::ToolArgument(format!("{} must be a non-negative integer", key))),
    }
}

fn get_str<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or("")
}

/// First `max_chars` characters of a text
fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Render metadata as `key: value, ...`, optionally hiding chunk bookkeeping
fn format_metadata(metadata: &Metadata, hide_chunk_keys: bool) -> String {
    metadata
        .iter()
        .filter(|(key, _)| {
            !hide_chunk_keys
                || (key.as_str() != CHUNK_INDEX_KEY && key.as_str() != TOTAL_CHUNKS_KEY)
        })
        .map(|(key, value)| match value {
            Value::String(s) => format!("{}: {}", key, s),
            other => format!("{}: {}", key, other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Execute add_documents
async fn tool_add_documents(ctx: &AppContext, args: &Value) -> Result<ToolResult> {
    let texts: Vec<String> = match args.get("texts") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            match items
                .iter()
                .map(|item| item.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
            {
                Some(texts) => texts,
                None => return Ok(ToolResult::text("Error: texts must be an array of strings")),
            }
        }
        Some(_) => return Ok(ToolResult::text("Error: texts must be an array of strings")),
    };

    if texts.is_empty() {
        return Ok(ToolResult::text("Error: No texts provided"));
    }

    let metadatas = args.get("metadatas").and_then(Value::as_array);
    let chunker = Chunker::new(
        get_usize(args, "chunk_size", DEFAULT_CHUNK_SIZE)?,
        get_usize(args, "chunk_overlap", DEFAULT_CHUNK_OVERLAP)?,
    )?;

    let mut chunks = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        let metadata = metadatas
            .and_then(|m| m.get(i))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        chunks.extend(chunker.chunk(&Document::with_metadata(text.as_str(), metadata)));
    }

    let chunk_count = chunks.len();
    ctx.store.add(chunks).await?;

    tracing::info!(
        "Added {} chunks from {} documents",
        chunk_count,
        texts.len()
    );

    Ok(ToolResult::text(format!(
        "✅ Successfully added {} document chunks from {} documents\n   Chunk size: {}, Overlap: {}",
        chunk_count,
        texts.len(),
        chunker.chunk_size(),
        chunker.chunk_overlap()
    )))
}

/// Execute search_documents
async fn tool_search_documents(ctx: &AppContext, args: &Value) -> Result<ToolResult> {
    let query = get_str(args, "query");
    if query.is_empty() {
        return Ok(ToolResult::text("Error: No query provided"));
    }
    let k = get_usize(args, "k", DEFAULT_K)?;

    let results = ctx.store.search(query, k).await?;
    if results.is_empty() {
        return Ok(ToolResult::text("No documents found matching your query."));
    }

    let mut text = format!("🔍 Found {} documents:\n", results.len());
    for (i, doc) in results.iter().enumerate() {
        let ellipsis = if doc.content.chars().count() > 200 { "..." } else { "" };
        text.push_str(&format!(
            "\n📄 Document {}:\nContent: {}{}\nMetadata: {}\n",
            i + 1,
            preview(&doc.content, 200),
            ellipsis,
            format_metadata(&doc.metadata, false)
        ));
    }

    Ok(ToolResult::text(text))
}

/// Prompt language for `rag_query`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptLanguage {
    Korean,
    English,
}

impl PromptLanguage {
    fn from_code(code: &str) -> Self {
        if code == "ko" {
            PromptLanguage::Korean
        } else {
            PromptLanguage::English
        }
    }
}

/// Numbered context blocks for the retrieved documents
fn build_context(docs: &[ScoredDocument]) -> String {
    docs.iter()
        .enumerate()
        .map(|(i, doc)| format!("[Document {}]\n{}", i + 1, doc.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_prompt(question: &str, docs: &[ScoredDocument], language: PromptLanguage) -> String {
    let context = build_context(docs);
    match language {
        PromptLanguage::Korean => format!(
            "다음 문서들을 참고하여 질문에 답변해주세요.\n\n\
             참고 문서:\n{}\n\n\
             질문: {}\n\n\
             위 문서들의 정보를 바탕으로 정확하고 자세하게 답변해주세요.",
            context, question
        ),
        PromptLanguage::English => format!(
            "Please answer the question based on the following documents.\n\n\
             Reference Documents:\n{}\n\n\
             Question: {}\n\n\
             Please provide an accurate and detailed answer based on the information above.",
            context, question
        ),
    }
}

/// Source listing appended to an answer
fn format_sources(docs: &[ScoredDocument]) -> String {
    let mut sources = format!("\n\n{}\n📚 Referenced Documents:\n", "=".repeat(60));
    for (i, doc) in docs.iter().enumerate() {
        let metadata = format_metadata(&doc.metadata, true);
        let metadata = if metadata.is_empty() {
            "No metadata".to_string()
        } else {
            metadata
        };
        sources.push_str(&format!(
            "  [{}] {}\n      Preview: {}...\n",
            i + 1,
            metadata,
            preview(&doc.content, 100).replace('\n', " ")
        ));
    }
    sources
}

/// Execute rag_query
async fn tool_rag_query(ctx: &AppContext, args: &Value) -> Result<ToolResult> {
    let question = get_str(args, "question");
    if question.is_empty() {
        return Ok(ToolResult::text("Error: No question provided"));
    }
    let k = get_usize(args, "k", DEFAULT_K)?;
    let language = args
        .get("language")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_LANGUAGE);

    let Some(completion) = ctx.completion.as_ref() else {
        return Ok(ToolResult::text("Error: ANTHROPIC_API_KEY not configured"));
    };

    let docs = ctx.store.search(question, k).await?;
    if docs.is_empty() {
        return Ok(ToolResult::text(
            "❌ No relevant documents found in the database.",
        ));
    }

    let prompt = build_prompt(question, &docs, PromptLanguage::from_code(language));
    let answer = match completion.complete(&prompt).await {
        Ok(answer) => answer,
        Err(e) => {
            tracing::warn!("Completion failed: {}", e);
            return Ok(ToolResult::text(format!("Error generating answer: {}", e)));
        }
    };

    Ok(ToolResult::text(format!(
        "💡 Answer:\n\n{}{}",
        answer,
        format_sources(&docs)
    )))
}

/// Execute get_collection_info
async fn tool_get_collection_info(ctx: &AppContext) -> ToolResult {
    let info = ctx.store.info();
    match ctx.store.count().await {
        Ok(count) => {
            let persist_directory = info
                .persist_directory
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(in memory)".to_string());
            ToolResult::text(format!(
                "📊 Collection Information:\n\n\
                 Collection Name: {}\n\
                 Total Documents: {}\n\
                 Persist Directory: {}\n\
                 Embedding Model: {}\n",
                info.collection_name, count, persist_directory, info.embedding_model
            ))
        }
        Err(e) => ToolResult::text(format!("Error getting collection info: {}", e)),
    }
}

/// Execute delete_collection
async fn tool_delete_collection(ctx: &AppContext, args: &Value) -> ToolResult {
    let confirm = args
        .get("confirm")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if !confirm {
        return ToolResult::text(
            "⚠️  Deletion cancelled. Set 'confirm' to true to delete the collection.",
        );
    }

    let outcome = async {
        ctx.store.delete_collection().await?;
        ctx.store.ensure_collection().await
    }
    .await;

    match outcome {
        Ok(()) => ToolResult::text("✅ Collection successfully deleted and reinitialized."),
        Err(e) => ToolResult::text(format!("Error deleting collection: {}", e)),
    }
}
