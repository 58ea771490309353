use axum::response::Html;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Welcome page HTML", content_type = "text/html")
    ),
    tag = "General"
)]
pub async fn root() -> Html<&'static str> {
    Html(r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <meta name="viewport" content="width=device-width, initial-scale=1.0">
            <title>Tubekit</title>
            <style>
                body {
                    display: flex;
                    flex-direction: column;
                    justify-content: center;
                    align-items: center;
                    height: 100vh;
                    margin: 0;
                    font-family: Arial, sans-serif;
                    background-color: #f0f0f0;
                }
                h1 { color: #333; }
                p { color: #666; }
                a {
                    margin-top: 20px;
                    padding: 10px 20px;
                    background-color: #c4302b;
                    color: white;
                    text-decoration: none;
                    border-radius: 5px;
                    font-weight: bold;
                }
            </style>
        </head>
        <body>
            <h1>Tubekit</h1>
            <p>Video metadata and asset uploads.</p>
            <a href="/swagger-ui/">Explore API Docs</a>
        </body>
        </html>
    "#)
}

#[utoipa::path(
    get,
    path = "/api/healthz",
    responses(
        (status = 200, description = "Service is up", body = String, content_type = "text/plain")
    ),
    tag = "General"
)]
pub async fn healthz() -> &'static str {
    "OK"
}
