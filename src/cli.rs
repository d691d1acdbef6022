use clap::Parser;

const EXAMPLES: &str = "\
Examples:
  mcpsnag http://localhost:3000/mcp -d '{\"method\":\"tools/list\"}'
  mcpsnag http://localhost:3000/mcp -H \"Authorization: Bearer token\" -d '{\"method\":\"tools/list\"}'
  mcpsnag http://localhost:3000/mcp --init-only";

#[derive(Parser, Debug)]
#[command(name = "mcpsnag", version)]
#[command(about = "A curl-like CLI for testing MCP servers over HTTP", long_about = None)]
#[command(after_help = EXAMPLES)]
pub struct Args {
    #[arg(help = "MCP endpoint URL (or MCPSNAG_URL / config file)")]
    pub url: Option<String>,

    #[arg(short = 'd', long = "data", help = "JSON body (method + params)")]
    pub data: Option<String>,

    #[arg(
        short = 'H',
        long = "header",
        help = "HTTP header as 'Key: Value' (repeatable)"
    )]
    pub headers: Vec<String>,

    #[arg(long = "raw", help = "Skip auto-initialization and send the body as-is")]
    pub raw: bool,

    #[arg(long = "session", help = "Use existing session ID")]
    pub session: Option<String>,

    #[arg(long = "init-only", help = "Only initialize, print session")]
    pub init_only: bool,

    #[arg(short = 'c', long = "compact", help = "Compact JSON output")]
    pub compact: bool,

    #[arg(long = "no-stream", help = "Wait for full response")]
    pub no_stream: bool,

    #[arg(short = 'v', long = "verbose", help = "Show request/response details")]
    pub verbose: bool,

    #[arg(long = "timeout", help = "Request timeout, e.g. 30s, 500ms, 2m [default: 30s]")]
    pub timeout: Option<String>,
}
