//! A small stdio tool server for exercising the MCP client.
//!
//! Flags:
//! - `--prefix <p>`: advertise every tool as `{p}{name}`
//! - `--label <l>`: prepend `{l}: ` to echo output
//! - `--page-size <n>`: split `tools/list` into pages of `n`
//! - `--noisy`: print a non-JSON banner before serving

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const TOOLS: [(&str, &str); 9] = [
    ("navigate", "Navigate to a URL"),
    ("click", "Click an element"),
    ("type", "Type into an element"),
    ("screenshot", "Capture the page"),
    ("get_content", "Read the page text"),
    ("back", "Go back"),
    ("echo", "Echo the text argument"),
    ("fail", "Always reports a tool error"),
    ("slow", "Sleep for `ms` milliseconds"),
];

#[derive(Default)]
struct Options {
    prefix: String,
    label: Option<String>,
    page_size: Option<usize>,
    noisy: bool,
}

impl Options {
    fn from_args() -> Self {
        let mut options = Options::default();
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--prefix" => options.prefix = args.next().unwrap_or_default(),
                "--label" => options.label = args.next(),
                "--page-size" => options.page_size = args.next().and_then(|n| n.parse().ok()),
                "--noisy" => options.noisy = true,
                _ => {}
            }
        }
        options
    }
}

#[derive(Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

fn text(text: impl Into<String>) -> Value {
    json!({"content": [{"type": "text", "text": text.into()}], "isError": false})
}

fn schema(name: &str) -> Value {
    let properties = match name {
        "navigate" => json!({"url": {"type": "string"}, "waitFor": {"type": "string"}}),
        "click" => json!({"selector": {"type": "string"}}),
        "type" => json!({"selector": {"type": "string"}, "text": {"type": "string"}}),
        "echo" => json!({"text": {"type": "string", "description": "Text to echo"}}),
        "slow" => json!({"ms": {"type": "integer"}}),
        _ => json!({}),
    };
    let required: Vec<&str> = match name {
        "navigate" => vec!["url"],
        "echo" => vec!["text"],
        _ => vec![],
    };
    json!({"type": "object", "properties": properties, "required": required})
}

fn list_tools(options: &Options, cursor: Option<&str>) -> Value {
    let all: Vec<Value> = TOOLS
        .iter()
        .map(|(name, description)| {
            json!({
                "name": format!("{}{}", options.prefix, name),
                "description": description,
                "inputSchema": schema(name),
            })
        })
        .collect();

    let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
    let size = options.page_size.unwrap_or(all.len()).max(1);
    let end = (start + size).min(all.len());
    let mut result = json!({"tools": all[start.min(end)..end]});
    if end < all.len() {
        result["nextCursor"] = json!(end.to_string());
    }
    result
}

async fn call_tool(options: &Options, params: &Value) -> Result<Value, (i64, String)> {
    let name = params["name"].as_str().unwrap_or_default();
    let arguments = &params["arguments"];
    let arg = |key: &str| arguments[key].as_str().unwrap_or_default().to_string();

    let Some(raw) = name.strip_prefix(options.prefix.as_str()) else {
        return Err((-32602, format!("Unknown tool: {}", name)));
    };
    let result = match raw {
        "navigate" => text(format!("Navigated to {}", arg("url"))),
        "click" => text(format!("Clicked {}", arg("selector"))),
        "type" => text(format!("Typed '{}' into {}", arg("text"), arg("selector"))),
        "screenshot" => json!({
            "content": [
                {"type": "text", "text": "Screenshot taken"},
                {"type": "image", "data": "aGVsbG8=", "mimeType": "image/png"}
            ]
        }),
        "get_content" => text("<html><body>stub page</body></html>"),
        "back" => text("Went back"),
        "echo" => match &options.label {
            Some(label) => text(format!("{}: {}", label, arg("text"))),
            None => text(arg("text")),
        },
        "fail" => json!({
            "content": [{"type": "text", "text": "element not found"}],
            "isError": true
        }),
        "slow" => {
            let ms = arguments["ms"].as_u64().unwrap_or(1000);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            text(format!("Slept {}ms", ms))
        }
        _ => return Err((-32602, format!("Unknown tool: {}", name))),
    };
    Ok(result)
}

async fn handle(options: &Options, request: Request) -> Option<Value> {
    let id = request.id?;
    let outcome = match request.method.as_str() {
        "initialize" => Ok(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "stub-mcp-server", "version": env!("CARGO_PKG_VERSION")}
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(list_tools(options, request.params["cursor"].as_str())),
        "tools/call" => call_tool(options, &request.params).await,
        other => Err((-32601, format!("Method not found: {}", other))),
    };
    Some(match outcome {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err((code, message)) => {
            json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
        }
    })
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let options = Options::from_args();
    let mut stdout = tokio::io::stdout();
    if options.noisy {
        stdout.write_all(b"stub-mcp-server starting\n").await?;
        stdout.flush().await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Ok(request) = serde_json::from_str::<Request>(&line) else {
            continue;
        };
        if let Some(reply) = handle(&options, request).await {
            stdout.write_all(format!("{}\n", reply).as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
