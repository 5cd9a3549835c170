use raw_http::{
    bind, default_headers, limits::ServerLimits, Handler, HandlerError, Headers, Request,
    ResponseWriter, Server, StatusCode,
};
use tokio::io::AsyncWrite;

const PORT: u16 = 42069;

const BAD_REQUEST: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>";

const INTERNAL_ERROR: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>";

const SUCCESS: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>";

struct Pages;

impl Pages {
    async fn html<W>(w: &mut ResponseWriter<W>, status: StatusCode, body: &str) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut headers = default_headers(body.len());
        headers.replace("Content-Type", "text/html");

        w.write_status_line(status).await?;
        w.set_headers(headers);
        w.write_headers().await?;
        w.write_body(body.as_bytes()).await?;
        Ok(())
    }

    async fn chunked<W>(w: &mut ResponseWriter<W>, count: usize) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut headers = default_headers(0);
        headers.remove("Content-Length");
        headers.replace("Transfer-Encoding", "chunked");
        headers.replace("Trailer", "X-Content-Length");

        w.write_status_line(StatusCode::OK).await?;
        w.set_headers(headers);
        w.write_headers().await?;

        let mut total = 0;
        for i in 0..count {
            total += w.write_chunked_body(format!("chunk {i}\n").as_bytes()).await?;
        }

        let mut trailers = Headers::new();
        trailers.set("X-Content-Length", total.to_string());
        w.write_chunked_body_done(&trailers).await?;
        Ok(())
    }
}

impl Handler for Pages {
    async fn handle<W>(&self, req: &Request, w: &mut ResponseWriter<W>) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        if let Some(count) = req.target().strip_prefix("/chunked/") {
            let count = count
                .parse::<usize>()
                .map_err(|_| HandlerError::new(StatusCode::BAD_REQUEST, "chunk count must be a number\n"))?;
            return Self::chunked(w, count).await;
        }

        match req.target() {
            "/yourproblem" => Self::html(w, StatusCode::BAD_REQUEST, BAD_REQUEST).await,
            "/myproblem" => Self::html(w, StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR).await,
            _ => Self::html(w, StatusCode::OK, SUCCESS).await,
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let limits = ServerLimits::default();
    let listener = bind(([0, 0, 0, 0], PORT).into(), &limits)?;

    let server = Server::builder()
        .listener(listener)
        .handler(Pages)
        .server_limits(limits)
        .build()
        .spawn();

    tokio::signal::ctrl_c().await?;
    server.close();
    server.join().await;

    Ok(())
}
