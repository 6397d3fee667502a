// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! HTTP gallery server.
//!
//! Query-string driven, one request at a time:
//! - `?image=<token>` - raw image bytes, MIME sniffed from content (the
//!   extension is never trusted); 404 `Image not found.` otherwise.
//! - `?page=<n>&per_page=<n>` - JSON array of image tokens for that page.
//!   No envelope, no total count; the shell walks pages until one is short.
//! - `?dir=<path>` - enumeration root for this request, honored only when
//!   it resolves under the startup root and the root was not pinned by the
//!   environment.
//! - anything else - the embedded HTML shell driving the two endpoints.

use std::path::{Path, PathBuf};

use tiny_http::{Header, Request, Response, Server};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::{page, scan, token};

const NOT_FOUND_BODY: &str = "Image not found.";

struct Reply {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Reply {
    fn not_found() -> Self {
        Self {
            status: 404,
            content_type: "text/plain",
            body: NOT_FOUND_BODY.as_bytes().to_vec(),
        }
    }
}

pub struct Gallery {
    root: PathBuf,
    /// Set when the root came from the environment; `?dir=` is then inert.
    root_pinned: bool,
    scan_depth: usize,
    debug: bool,
}

impl Gallery {
    pub fn new(root: PathBuf, root_pinned: bool, config: &Config) -> Result<Self> {
        let root = root.canonicalize()?;
        if !root.is_dir() {
            return Err(Error::NotFound(root));
        }
        Ok(Self {
            root,
            root_pinned,
            scan_depth: config.scan_depth,
            debug: config.debug,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run(&self, bind: &str) -> anyhow::Result<()> {
        let server =
            Server::http(bind).map_err(|err| anyhow::anyhow!("cannot bind {bind}: {err}"))?;
        eprintln!("sig: serving {} on http://{bind}/", self.root().display());

        for request in server.incoming_requests() {
            let reply = self.handle(request.url());
            respond(request, reply);
        }
        Ok(())
    }

    fn handle(&self, url: &str) -> Reply {
        let params = parse_query(url);

        if let Some(tok) = param(&params, "image") {
            return match self.image_reply(tok) {
                Ok((mime, bytes)) => Reply {
                    status: 200,
                    content_type: mime,
                    body: bytes,
                },
                Err(err) => {
                    if self.debug {
                        eprintln!("sig: image request rejected: {err}");
                    }
                    Reply::not_found()
                }
            };
        }

        if let (Some(p), Some(pp)) = (param(&params, "page"), param(&params, "per_page")) {
            let dir = param(&params, "dir");
            return match self.page_reply(dir, parse_count(p), parse_count(pp)) {
                Ok(json) => Reply {
                    status: 200,
                    content_type: "application/json",
                    body: json.into_bytes(),
                },
                Err(err) => {
                    eprintln!("sig: page request failed: {err}");
                    Reply::not_found()
                }
            };
        }

        Reply {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: INDEX_HTML.as_bytes().to_vec(),
        }
    }

    /// Enumeration root for one request: the startup root unless a valid
    /// confined `?dir=` override is present.
    fn resolve_dir(&self, dir: Option<&str>) -> PathBuf {
        if self.root_pinned {
            return self.root.clone();
        }
        let Some(dir) = dir else {
            return self.root.clone();
        };
        match Path::new(dir).canonicalize() {
            Ok(p) if p.is_dir() && p.starts_with(&self.root) => p,
            _ => {
                eprintln!("sig: ignoring dir override outside gallery root: {dir}");
                self.root.clone()
            }
        }
    }

    fn page_reply(&self, dir: Option<&str>, page_index: usize, per_page: usize) -> Result<String> {
        let root = self.resolve_dir(dir);
        let images = scan::enumerate(&root, self.scan_depth)?;
        let tokens: Vec<String> = page::paginate(&images, page_index, per_page)
            .iter()
            .map(|r| token::encode(&r.path))
            .collect();
        Ok(serde_json::to_string(&tokens).map_err(std::io::Error::other)?)
    }

    fn image_reply(&self, tok: &str) -> Result<(&'static str, Vec<u8>)> {
        let requested = token::decode(tok)?;
        let path = token::confine(&self.root, &requested)?;
        let bytes = std::fs::read(&path)?;
        Ok((sniff_mime(&bytes), bytes))
    }
}

/// MIME type from the file's leading bytes, never from its name.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

fn respond(request: Request, reply: Reply) {
    let mut response = Response::from_data(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(header);
    }
    if let Err(err) = request.respond(response) {
        eprintln!("sig: response failed: {err}");
    }
}

fn parse_query(url: &str) -> Vec<(String, String)> {
    let Some(query) = url.splitn(2, '?').nth(1) else {
        return Vec::new();
    };
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut kv = pair.splitn(2, '=');
            let key = kv.next()?;
            let value = kv.next().unwrap_or("");
            let key = urlencoding::decode(key).ok()?;
            let value = urlencoding::decode(value).ok()?;
            Some((key.into_owned(), value.into_owned()))
        })
        .collect()
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Paging parameters clamp to 1; garbage is not an error.
fn parse_count(value: &str) -> usize {
    value.trim().parse::<usize>().unwrap_or(1).max(1)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Gallery</title>
<style>
  body { margin: 0; background: #0a0a0f; color: #ddd; font: 14px sans-serif; }
  #bar { display: flex; justify-content: space-between; padding: 10px; }
  #bar input { width: 4em; }
  #thumbs { display: grid; grid-template-columns: repeat(auto-fill, minmax(140px, 1fr)); gap: 8px; padding: 10px; }
  #thumbs img { width: 100%; height: 120px; object-fit: cover; cursor: pointer; }
  #thumbs img.selected { outline: 2px solid #48f; }
  #thumbs img.checked { outline: 2px solid #38f; filter: grayscale(1); }
  #full { display: none; position: fixed; inset: 0; background: rgba(0,0,0,.95); align-items: center; justify-content: center; }
  #full.open { display: flex; }
  #full img { max-width: 100vw; max-height: 100vh; }
  #close { position: absolute; top: 12px; right: 16px; color: #fff; font-size: 24px; cursor: pointer; }
</style>
</head>
<body>
<div id="bar">
  <label>Per page <input type="number" id="perPage" value="10" min="1"></label>
  <div>
    <button id="prev">Previous</button>
    <button id="next">Next</button>
  </div>
</div>
<div id="thumbs"></div>
<div id="full"><img id="fullImg" src="" alt=""><span id="close">X</span></div>
<script>
(() => {
  const thumbs = document.getElementById('thumbs');
  const full = document.getElementById('full');
  const fullImg = document.getElementById('fullImg');
  const perPageInput = document.getElementById('perPage');
  let page = 1;
  let perPage = parseInt(perPageInput.value, 10);
  let tokens = [];
  let selected = 0;
  let touchStartX = 0;

  const fetchPage = () =>
    fetch(`?page=${page}&per_page=${perPage}`)
      .then(r => r.json())
      .then(data => { tokens = data; render(); });

  const render = () => {
    thumbs.innerHTML = '';
    tokens.forEach((tok, i) => {
      const img = document.createElement('img');
      img.src = `?image=${encodeURIComponent(tok)}`;
      img.addEventListener('click', () => select(i));
      thumbs.appendChild(img);
    });
    select(0);
  };

  const select = (i) => {
    if (!tokens.length) return;
    selected = Math.max(0, Math.min(i, tokens.length - 1));
    [...thumbs.children].forEach((el, j) => el.classList.toggle('selected', j === selected));
    if (full.classList.contains('open')) fullImg.src = thumbs.children[selected].src;
  };

  const isFull = () => full.classList.contains('open');
  const openFull = () => { full.classList.add('open'); fullImg.src = thumbs.children[selected].src; };
  const closeFull = () => full.classList.remove('open');
  const toggleCheck = () => thumbs.children[selected] && thumbs.children[selected].classList.toggle('checked');

  document.getElementById('next').addEventListener('click', () => { page++; fetchPage(); });
  document.getElementById('prev').addEventListener('click', () => { if (page > 1) { page--; fetchPage(); } });
  document.getElementById('close').addEventListener('click', closeFull);
  perPageInput.addEventListener('change', () => {
    perPage = Math.max(1, parseInt(perPageInput.value, 10) || 1);
    page = 1;
    fetchPage();
  });

  document.addEventListener('keydown', (ev) => {
    const step = ev.ctrlKey ? 10 : 1;
    switch (ev.key) {
      case 'ArrowRight': select(selected + step); break;
      case 'ArrowLeft': select(selected - step); break;
      case 'Enter': if (!isFull()) openFull(); break;
      case 'Escape': closeFull(); break;
      case ' ': ev.preventDefault(); toggleCheck(); break;
    }
  });

  document.addEventListener('touchstart', (ev) => { touchStartX = ev.changedTouches[0].screenX; });
  document.addEventListener('touchend', (ev) => {
    const endX = ev.changedTouches[0].screenX;
    if (endX === touchStartX) return;
    const forward = endX < touchStartX;
    if (isFull()) {
      select(selected + (forward ? 1 : -1));
    } else if (forward) {
      document.getElementById('next').click();
    } else {
      document.getElementById('prev').click();
    }
  });

  fetchPage();
})();
</script>
</body>
</html>
"#;
