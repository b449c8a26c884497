//! DANFE NFC-e document layout.
//!
//! Renders the consumer fiscal receipt section by section onto a canvas:
//! optional logo, issuer header, item table, totals block, access key
//! block, buyer block, authorization block, QR symbol and closing notes
//! (including the homologation watermark for test documents). The final
//! height is only known once everything is placed, so the canvas starts
//! oversized and is trimmed to the next multiple of 8 rows, ready for the
//! encoder.
//!
//! Monetary values are integer centavos throughout; the pt-BR display
//! formatting lives in [`moeda`], [`numero`] and [`inteiro`].

use log::debug;

use crate::error::Error;
use crate::font::FontPair;
use crate::layout::{draw_qr, Align, LayoutBox, QrMatrix, QrScale, TextPainter};
use crate::surface::{Bitmap, Canvas};

/// Vertical reserve for the draw surface, in text lines. Receipts are far
/// shorter than this; the excess is trimmed away by `Canvas::finish`.
const RESERVE_LINES: i32 = 1250;

/// Buyer identification, mutually exclusive document kinds.
#[derive(Debug, Clone)]
pub enum BuyerId {
    Cpf(String),
    Cnpj(String),
    Foreign(String),
}

/// Receipt issuer. The display strings come preformatted from the fiscal
/// document; this crate does no CNPJ masking of its own.
#[derive(Debug, Clone)]
pub struct Issuer {
    pub name: String,
    pub cnpj: String,
    /// Street, number, district, city, state.
    pub address: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Buyer {
    pub name: Option<String>,
    pub id: Option<BuyerId>,
    pub address: Vec<String>,
}

/// One line item. Quantity and prices are preformatted display strings,
/// e.g. `"7"`, `"30,00"`.
#[derive(Debug, Clone)]
pub struct Item {
    pub code: String,
    pub description: String,
    pub quantity: String,
    pub unit: String,
    pub unit_price: String,
    pub total: String,
}

/// ICMS totals in centavos. Zero lines are omitted from the render.
#[derive(Debug, Clone, Default)]
pub struct Totals {
    pub products: i64,
    pub freight: i64,
    pub insurance: i64,
    pub other: i64,
    pub discount: i64,
    pub grand_total: i64,
}

#[derive(Debug, Clone)]
pub struct Payment {
    pub method: String,
    pub amount: i64,
}

/// The fields of a DANFE NFC-e the renderer consumes. Dates are already
/// formatted for display; the access key keeps its `NFe` prefix.
#[derive(Debug, Clone)]
pub struct Document {
    pub access_key: String,
    pub number: u64,
    pub series: u64,
    pub issued_at: String,
    /// `tpAmb = 2`: test environment, triggers the watermark.
    pub homologation: bool,
    pub issuer: Issuer,
    pub buyer: Option<Buyer>,
    pub items: Vec<Item>,
    pub totals: Totals,
    pub payments: Vec<Payment>,
    pub change: i64,
    pub protocol_number: String,
    pub authorized_at: String,
    pub consult_url: String,
    pub qr_payload: String,
    pub fisco_note: Option<String>,
    pub authorization_note: Option<String>,
    pub taxpayer_note: Option<String>,
}

/// Render configuration. Chainable setters, applied over sane defaults.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    width: u32,
    line_height: u32,
    scale: u32,
    qr_scale: QrScale,
    logo: Option<Bitmap>,
}

impl RenderConfig {
    /// Paper width in pixels. Line height defaults to 16 at scale 1 with a
    /// medium QR symbol and no logo.
    pub fn new(width: u32) -> Self {
        RenderConfig {
            width,
            line_height: 16,
            scale: 1,
            qr_scale: QrScale::M,
            logo: None,
        }
    }

    pub fn line_height(self, line_height: u32) -> Self {
        RenderConfig {
            line_height,
            ..self
        }
    }

    /// Integer pixel zoom, 1 or 2.
    pub fn scale(self, scale: u32) -> Self {
        RenderConfig { scale, ..self }
    }

    pub fn qr_scale(self, qr_scale: QrScale) -> Self {
        RenderConfig { qr_scale, ..self }
    }

    /// Pre-dithered logo, blitted horizontally centered above the header.
    pub fn logo(self, logo: Bitmap) -> Self {
        RenderConfig {
            logo: Some(logo),
            ..self
        }
    }
}

/// Render a document to a monochrome raster.
///
/// The QR matrix is produced externally from [`Document::qr_payload`] and
/// passed in; the renderer only paints its dark modules.
pub fn render(
    doc: &Document,
    fonts: &FontPair,
    qr: &dyn QrMatrix,
    config: &RenderConfig,
) -> Result<Bitmap, Error> {
    let reserve = config.line_height * config.scale * RESERVE_LINES as u32;
    let mut state = Render {
        canvas: Canvas::new(config.width, reserve),
        painter: TextPainter::new(fonts, config.line_height, config.scale),
        width: config.width as i32,
        y: 0,
    };

    state.logo(config.logo.as_ref());
    state.issuer_header(doc)?;
    state.item_table(doc)?;
    state.totals_block(doc)?;
    state.access_key_block(doc)?;
    state.buyer_block(doc)?;
    state.authorization_block(doc)?;
    state.qr_block(qr, config.qr_scale);
    state.notes_block(doc)?;

    // Byte-align the discovered height for the encoder.
    let height = ((state.y + 1 + 7) / 8 * 8) as u32;
    debug!("rendered receipt {}x{}", config.width, height);
    Ok(state.canvas.finish(height))
}

struct Render<'f> {
    canvas: Canvas,
    painter: TextPainter<'f>,
    width: i32,
    y: i32,
}

impl<'f> Render<'f> {
    fn space(&mut self) {
        self.y += self.painter.line_advance();
    }

    fn write(&mut self, text: &str, align: Align, bold: bool) -> Result<(), Error> {
        self.y = self.painter.draw(
            &mut self.canvas,
            text,
            LayoutBox {
                x: 0,
                y: self.y,
                max_width: self.width,
                align,
            },
            bold,
        )?;
        Ok(())
    }

    fn pair(&mut self, left: &str, right: &str) -> Result<(), Error> {
        self.pair_opts(left, right, 0.6, (false, false))
    }

    fn pair_opts(
        &mut self,
        left: &str,
        right: &str,
        ratio: f32,
        bold: (bool, bool),
    ) -> Result<(), Error> {
        self.y = self
            .painter
            .draw_pair(&mut self.canvas, left, right, 0, self.y, self.width, ratio, bold)?;
        Ok(())
    }

    fn logo(&mut self, logo: Option<&Bitmap>) {
        if let Some(logo) = logo {
            let x = (self.width - logo.width() as i32) / 2;
            self.canvas.blit(logo, x, 0);
            self.y += logo.height() as i32;
        }
        self.space();
    }

    fn issuer_header(&mut self, doc: &Document) -> Result<(), Error> {
        let issuer = &doc.issuer;
        self.write(&issuer.name, Align::Center, true)?;
        self.write(&format!("CNPJ: {}", issuer.cnpj), Align::Center, false)?;
        self.write(&issuer.address.join(", "), Align::Center, false)?;
        self.space();
        self.write(
            "Documento Auxiliar da Nota Fiscal de Consumidor Eletrônica",
            Align::Center,
            true,
        )?;
        self.space();
        Ok(())
    }

    fn item_table(&mut self, doc: &Document) -> Result<(), Error> {
        // Fixed fractions for code, quantity, unit, unit price and total;
        // the description takes whatever is left.
        let mut widths: Vec<i32> = [0.1, 0.1, 0.15, 0.15, 0.15]
            .iter()
            .map(|f| (self.width as f32 * f).round() as i32)
            .collect();
        let used: i32 = widths.iter().sum();
        widths.insert(1, self.width - used);

        let aligns = [
            Align::Left,
            Align::Left,
            Align::Right,
            Align::Left,
            Align::Right,
            Align::Right,
        ];

        let mut rows: Vec<Vec<String>> = vec![vec![
            "Cód".into(),
            "Descrição".into(),
            "Qtde".into(),
            "Un med".into(),
            "Vl un".into(),
            "Total".into(),
        ]];
        for item in &doc.items {
            rows.push(vec![
                item.code.clone(),
                item.description.clone(),
                item.quantity.clone(),
                item.unit.clone(),
                item.unit_price.clone(),
                item.total.clone(),
            ]);
        }

        self.y = self
            .painter
            .draw_table(&mut self.canvas, 0, self.y, &widths, &aligns, &rows)?;
        self.space();
        Ok(())
    }

    fn totals_block(&mut self, doc: &Document) -> Result<(), Error> {
        let totals = &doc.totals;
        self.write("Totais", Align::Center, true)?;
        self.pair("Qtde. total de itens", &doc.items.len().to_string())?;
        self.pair("Valor total", &moeda(totals.products))?;
        if totals.freight != 0 {
            self.pair("Frete total", &moeda(totals.freight))?;
        }
        if totals.insurance != 0 {
            self.pair("Seguro total", &moeda(totals.insurance))?;
        }
        if totals.other != 0 {
            self.pair("Outras despesas", &moeda(totals.other))?;
        }
        if totals.discount != 0 {
            self.pair("Desconto total", &format!("- {}", moeda(totals.discount)))?;
        }
        self.pair("Valor a pagar", &moeda(totals.grand_total))?;
        self.pair_opts("Forma de pagamento", "Valor pago", 0.6, (true, true))?;
        for payment in &doc.payments {
            self.pair(&payment.method, &moeda(payment.amount))?;
        }
        self.pair("Valor do troco", &moeda(doc.change))?;
        self.space();
        Ok(())
    }

    fn access_key_block(&mut self, doc: &Document) -> Result<(), Error> {
        self.write("Consulte pela chave de acesso em", Align::Center, true)?;
        self.write(&doc.consult_url, Align::Center, false)?;
        self.write(&chave_formatada(&doc.access_key), Align::Center, false)?;
        self.space();
        Ok(())
    }

    fn buyer_block(&mut self, doc: &Document) -> Result<(), Error> {
        self.write("Consumidor", Align::Center, true)?;
        match &doc.buyer {
            Some(buyer) => {
                if let Some(name) = &buyer.name {
                    self.write(name, Align::Center, false)?;
                }
                match &buyer.id {
                    Some(BuyerId::Cpf(cpf)) => {
                        self.write(&format!("CPF: {}", cpf), Align::Center, false)?
                    }
                    Some(BuyerId::Cnpj(cnpj)) => {
                        self.write(&format!("CNPJ: {}", cnpj), Align::Center, false)?
                    }
                    Some(BuyerId::Foreign(id)) => {
                        self.write(&format!("Id. estrangeiro: {}", id), Align::Center, false)?
                    }
                    None => {}
                }
                if !buyer.address.is_empty() {
                    self.write(&buyer.address.join(", "), Align::Center, false)?;
                }
            }
            None => self.write("CONSUMIDOR NÃO IDENTIFICADO", Align::Center, false)?,
        }
        self.space();
        Ok(())
    }

    fn authorization_block(&mut self, doc: &Document) -> Result<(), Error> {
        self.write("Identificação e autorização", Align::Center, true)?;
        self.pair_opts("Número:", &inteiro(doc.number, 9), 0.5, (false, false))?;
        self.pair_opts("Série:", &inteiro(doc.series, 3), 0.5, (false, false))?;
        self.pair_opts("Data de emissão:", &doc.issued_at, 0.5, (false, false))?;
        self.pair_opts(
            "Protocolo de autorização:",
            &doc.protocol_number,
            0.5,
            (false, false),
        )?;
        self.pair_opts("Data de autorização:", &doc.authorized_at, 0.5, (false, false))?;
        Ok(())
    }

    fn qr_block(&mut self, qr: &dyn QrMatrix, scale: QrScale) {
        self.y = draw_qr(&mut self.canvas, qr, self.y, self.width, scale);
    }

    fn notes_block(&mut self, doc: &Document) -> Result<(), Error> {
        let has_closing = doc.fisco_note.is_some()
            || doc.authorization_note.is_some()
            || doc.homologation;
        if has_closing {
            if let Some(note) = &doc.fisco_note {
                self.write(note, Align::Left, false)?;
            }
            if let Some(note) = &doc.authorization_note {
                self.write(note, Align::Left, false)?;
            }
            if doc.homologation {
                self.write(
                    "EMITIDA EM AMBIENTE DE HOMOLOGAÇÃO - SEM VALOR FISCAL",
                    Align::Center,
                    false,
                )?;
            }
            if doc.taxpayer_note.is_some() {
                self.space();
            }
        }
        if let Some(note) = &doc.taxpayer_note {
            self.write(note, Align::Center, false)?;
        }
        Ok(())
    }
}

/// pt-BR currency display: `moeda(31000)` is `"R$ 310,00"`,
/// `moeda(123456)` is `"R$ 1.234,56"`.
pub fn moeda(centavos: i64) -> String {
    let negative = centavos < 0;
    let value = centavos.abs();
    let grouped = agrupar(&(value / 100).to_string());
    format!(
        "{}R$ {},{:02}",
        if negative { "-" } else { "" },
        grouped,
        value % 100
    )
}

/// Plain pt-BR number from centavos. With `optional_decimals`, whole values
/// drop the fraction: `numero(700, true)` is `"7"`, `numero(3000, false)`
/// is `"30,00"`.
pub fn numero(centavos: i64, optional_decimals: bool) -> String {
    let grouped = agrupar(&(centavos / 100).to_string());
    if optional_decimals && centavos % 100 == 0 {
        grouped
    } else {
        format!("{},{:02}", grouped, centavos % 100)
    }
}

/// Zero-padded grouped integer: `inteiro(7, 9)` is `"000.000.007"`.
pub fn inteiro(value: u64, min_digits: usize) -> String {
    let mut digits = value.to_string();
    while digits.len() < min_digits {
        digits.insert(0, '0');
    }
    agrupar(&digits)
}

/// Access key display: drop the `NFe` prefix and group the digits in
/// blocks of four separated by single spaces.
pub fn chave_formatada(access_key: &str) -> String {
    let digits: &str = if access_key.starts_with("NFe") {
        &access_key[3..]
    } else {
        access_key
    };
    digits
        .as_bytes()
        .chunks(4)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Thousands grouping with dots, pt-BR style.
fn agrupar(digits: &str) -> String {
    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(*b as char);
    }
    out
}
