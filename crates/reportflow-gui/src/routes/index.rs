use axum::response::Html;

/// The form page. Kept inline; there is no SPA build step for a single form.
const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Research Analysis Flow</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 50rem; margin: 2rem auto; padding: 0 1rem; }
  textarea { width: 100%; min-height: 3rem; font-size: 1rem; }
  button { padding: 0.5rem 1.25rem; font-size: 1rem; cursor: pointer; }
  .examples button { margin: 0.2rem; font-size: 0.85rem; }
  #output { white-space: pre-wrap; border: 1px solid #ccc; border-radius: 6px; padding: 1rem; margin-top: 1rem; min-height: 4rem; }
</style>
</head>
<body>
<h1>Research Analysis Flow</h1>
<p>An advanced multi-agent system that conducts research and produces structured reports.</p>
<p><strong>How it works:</strong></p>
<ol>
  <li><strong>Research Analyst</strong> - Gathers comprehensive information on your topic</li>
  <li><strong>Data Analyst</strong> - Analyzes findings and identifies key insights</li>
  <li><strong>Report Writer</strong> - Compiles everything into a structured report</li>
</ol>
<p><em>Note: Analysis takes 1-3 minutes as multiple AI agents work together.</em></p>
<textarea id="topic" placeholder="e.g., AI trends in 2024, Electric vehicle market, Remote work productivity"></textarea>
<p><button id="analyze">Analyze</button></p>
<div class="examples">
  Examples:
  <button data-topic="AI trends in 2024">AI trends in 2024</button>
  <button data-topic="The future of renewable energy">The future of renewable energy</button>
  <button data-topic="Impact of remote work on productivity">Impact of remote work on productivity</button>
  <button data-topic="Emerging cybersecurity threats">Emerging cybersecurity threats</button>
</div>
<div id="output"></div>
<script>
const topicInput = document.getElementById('topic');
const output = document.getElementById('output');

document.querySelectorAll('.examples button').forEach(btn => {
  btn.addEventListener('click', () => { topicInput.value = btn.dataset.topic; });
});

async function analyze() {
  output.textContent = '';
  const response = await fetch('/api/analyses', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ topic: topicInput.value }),
  });
  if (!response.ok) {
    const body = await response.json().catch(() => ({}));
    output.textContent = body.error || 'Request failed.';
    return;
  }
  const { analysis_id } = await response.json();
  const source = new EventSource(`/api/analyses/${analysis_id}/stream`);
  const show = event => {
    const payload = JSON.parse(event.data);
    output.textContent = payload.message;
  };
  source.addEventListener('processing', show);
  source.addEventListener('completed', event => { show(event); source.close(); });
  source.addEventListener('error', event => {
    if (event.data) show(event);
    source.close();
  });
}

document.getElementById('analyze').addEventListener('click', analyze);
topicInput.addEventListener('keydown', event => {
  if (event.key === 'Enter' && !event.shiftKey) { event.preventDefault(); analyze(); }
});
</script>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
