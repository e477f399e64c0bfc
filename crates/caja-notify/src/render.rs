//! [`HtmlSnapshotRenderer`] — turns a consolidation into a self-contained
//! HTML document.
//!
//! Rendering is a pure transformation: the same data always produces the
//! same bytes, and nothing here touches the network. The same summary markup
//! doubles as the notification body.

use caja_core::{
  Result,
  external::{RenderedDocument, SnapshotData, SnapshotRenderer},
};
use rust_decimal::Decimal;

pub struct HtmlSnapshotRenderer;

impl SnapshotRenderer for HtmlSnapshotRenderer {
  fn render(&self, data: &SnapshotData) -> Result<RenderedDocument> {
    let body = summary_html(data);
    let title = format!("Consolidación Caja Menor — {}", esc(&data.advance.beneficiary));
    let html = format!(
      "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n\
       <title>{title}</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    );

    Ok(RenderedDocument {
      file_name:    format!("consolidacion-{}.html", data.advance.id),
      content_type: "text/html; charset=utf-8".to_string(),
      bytes:        html.into_bytes(),
    })
  }
}

/// The human-readable consolidation summary: header data, the per-item
/// table, and the aggregate figures.
pub fn summary_html(data: &SnapshotData) -> String {
  let advance = &data.advance;
  let agg = &data.aggregate;

  let mut out = String::new();
  out.push_str("<h1>Consolidación de Caja Menor</h1>\n");
  out.push_str("<table>\n");
  row(&mut out, "Fecha anticipo", &advance.date.to_string());
  row(&mut out, "Beneficiario", &advance.beneficiary);
  row(&mut out, "Nit/CC", &advance.tax_id);
  row(&mut out, "Concepto", &advance.concept);
  row(&mut out, "Registró", &advance.registered_by);
  out.push_str("</table>\n");

  out.push_str("<h2>Gastos</h2>\n<table>\n<tr>\
    <th>Fecha</th><th>Beneficiario</th><th>Concepto</th>\
    <th>Centro de costo</th><th>Valor</th></tr>\n");
  for item in &data.items {
    out.push_str(&format!(
      "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
      item.date,
      esc(&item.beneficiary),
      esc(&item.concept),
      esc(&item.cost_center),
      money(item.amount),
    ));
  }
  out.push_str("</table>\n");

  out.push_str("<h2>Totales</h2>\n<table>\n");
  row(&mut out, "Valor entregado", &money(advance.amount));
  row(&mut out, "Total gastado", &money(agg.total_spent));
  row(&mut out, "Saldo", &money(agg.remaining));
  out.push_str("</table>\n");
  out
}

fn row(out: &mut String, label: &str, value: &str) {
  out.push_str(&format!("<tr><th>{}</th><td>{}</td></tr>\n", esc(label), esc(value)));
}

fn money(amount: Decimal) -> String { format!("$ {}", amount.round_dp(2)) }

fn esc(s: &str) -> String {
  s.replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}
