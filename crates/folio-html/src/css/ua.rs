/// Built-in user-agent stylesheet, loaded below author styles.
pub const USER_AGENT_CSS: &str = r#"
head, style, script, title, meta, link, template, noscript, [hidden] { display: none }

html, body, div, section, article, header, footer, nav, main, aside, address,
blockquote, figure, figcaption, form, center, p, pre, h1, h2, h3, h4, h5, h6,
ul, ol { display: block }

li { display: list-item }
table { display: table; border-collapse: separate }
tr { display: table-row }
td, th { display: table-cell; padding: 1pt }
th { font-weight: bold; text-align: center }

span, a, b, strong, i, em, u, s, small, code, sub, sup, label, mark, img, br { display: inline }

p, blockquote, ul, ol, pre { margin-top: 1em; margin-bottom: 1em }
blockquote { margin-left: 40px; margin-right: 40px }
ul, ol { padding-left: 30pt }
ul { list-style-type: disc }
ol { list-style-type: decimal }

h1 { font-size: 2em; margin-top: 0.67em; margin-bottom: 0.67em; font-weight: bold }
h2 { font-size: 1.5em; margin-top: 0.83em; margin-bottom: 0.83em; font-weight: bold }
h3 { font-size: 1.17em; margin-top: 1em; margin-bottom: 1em; font-weight: bold }
h4 { margin-top: 1.33em; margin-bottom: 1.33em; font-weight: bold }
h5 { font-size: 0.83em; margin-top: 1.67em; margin-bottom: 1.67em; font-weight: bold }
h6 { font-size: 0.67em; margin-top: 2.33em; margin-bottom: 2.33em; font-weight: bold }

b, strong { font-weight: bold }
i, em { font-style: italic }
u { text-decoration: underline }
s { text-decoration: line-through }
small { font-size: 0.83em }
sub { vertical-align: sub; font-size: 0.83em }
sup { vertical-align: super; font-size: 0.83em }
mark { background-color: yellow; color: black }
pre, code { font-family: monospace }
pre { white-space: pre }
a { color: blue; text-decoration: underline }
"#;
