//! End-to-end pipeline tests: BDF font -> layout -> raster -> ESC/POS.

use nfce_pos::receipt::{
    self, Buyer, BuyerId, Document, Issuer, Item, Payment, RenderConfig, Totals,
};
use nfce_pos::{
    CutKind, Dither, Encoder, Font, FontPair, ImageMode, QrMatrix, QrScale, RgbaImage,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fixed 8x16 ASCII font; accented characters fall back to DEFAULT_CHAR.
fn fixture_fonts() -> FontPair {
    let mut source = String::from(
        "STARTFONT 2.1\nFONT -test-terminus-medium\nSIZE 16 75 75\nFONTBOUNDINGBOX 8 16 0 -2\n\
         STARTPROPERTIES 2\nPIXEL_SIZE 16\nDEFAULT_CHAR 32\nENDPROPERTIES\nCHARS 95\n",
    );
    for cp in 32u32..127 {
        source.push_str(&format!(
            "STARTCHAR U+{:04X}\nENCODING {}\nSWIDTH 500 0\nDWIDTH 8 0\nBBX 8 16 0 -2\nBITMAP\n",
            cp, cp
        ));
        for row in 0u32..16 {
            // Not a readable face, just a stable per-codepoint pattern.
            source.push_str(&format!("{:02X}\n", (cp as u8).rotate_left(row % 8) | 0x18));
        }
        source.push_str("ENDCHAR\n");
    }
    source.push_str("ENDFONT\n");
    FontPair::single(Font::load(&source).unwrap())
}

/// QR matrix provider backed by the `qrcode` crate, the external collaborator
/// behind the `QrMatrix` seam.
struct Qr {
    width: usize,
    modules: Vec<qrcode::Color>,
}

impl Qr {
    fn new(data: &str) -> Self {
        let code = qrcode::QrCode::with_version(
            data.as_bytes(),
            qrcode::Version::Normal(8),
            qrcode::EcLevel::M,
        )
        .unwrap();
        Qr {
            width: code.width(),
            modules: code.to_colors(),
        }
    }
}

impl QrMatrix for Qr {
    fn module_count(&self) -> u32 {
        self.width as u32
    }

    fn is_dark(&self, row: u32, col: u32) -> bool {
        self.modules[row as usize * self.width + col as usize] == qrcode::Color::Dark
    }
}

/// One-item homologation receipt: AREIA LAVADA, 7 x R$ 30,00 plus freight.
fn sample_document() -> Document {
    Document {
        access_key: "NFe25211012931158000164550010000000071187213591".to_string(),
        number: 7,
        series: 1,
        issued_at: "02/10/2021 19:59:54".to_string(),
        homologation: true,
        issuer: Issuer {
            name: "SEVERINO ALVES SERAFIM".to_string(),
            cnpj: "12.931.158/0001-64".to_string(),
            address: vec![
                "SÍTIO BARRA".to_string(),
                "45".to_string(),
                "ZONA RURAL".to_string(),
                "Cuitegi".to_string(),
                "PB".to_string(),
            ],
        },
        buyer: Some(Buyer {
            name: Some("Lumer Informática Serviços Digitais LTDA".to_string()),
            id: Some(BuyerId::Cnpj("10.422.724/0001-87".to_string())),
            address: vec![
                "Av. Rio de Janeiro".to_string(),
                "1060".to_string(),
                "Santa Gertrudes do Assaí de Baixo".to_string(),
                "PR".to_string(),
            ],
        }),
        items: vec![Item {
            code: "001".to_string(),
            description: "AREIA LAVADA".to_string(),
            quantity: receipt::numero(700, true),
            unit: "MT CUB".to_string(),
            unit_price: receipt::numero(3000, false),
            total: receipt::numero(21000, false),
        }],
        totals: Totals {
            products: 21000,
            freight: 10000,
            insurance: 0,
            other: 0,
            discount: 0,
            grand_total: 31000,
        },
        payments: vec![Payment {
            method: "Dinheiro".to_string(),
            amount: 31000,
        }],
        change: 0,
        protocol_number: "325210000035406".to_string(),
        authorized_at: "02/10/2021 20:00:42".to_string(),
        consult_url: "http://www.fazenda.pr.gov.br/nfce/consulta".to_string(),
        qr_payload: "http://www.fazenda.pr.gov.br/nfce/qrcode?p=41200323285089000185650010000013051817822496|2|2|1|9D6AB4765658166993902F7F7C26FCD0965E328F".to_string(),
        fisco_note: None,
        authorization_note: None,
        taxpayer_note: None,
    }
}

fn count_ink(bitmap: &nfce_pos::Bitmap) -> usize {
    let mut n = 0;
    for y in 0..bitmap.height() {
        for x in 0..bitmap.width() {
            if bitmap.pixel(x, y) {
                n += 1;
            }
        }
    }
    n
}

#[test]
fn renders_one_item_receipt_at_300px() {
    init_logging();
    let doc = sample_document();
    let fonts = fixture_fonts();
    let qr = Qr::new(&doc.qr_payload);
    let config = RenderConfig::new(300).qr_scale(QrScale::P);

    let bitmap = receipt::render(&doc, &fonts, &qr, &config).unwrap();

    assert_eq!(bitmap.width(), 300);
    assert_eq!(bitmap.height() % 8, 0);
    assert!(bitmap.height() > 40 * 16, "receipt should span many lines");
    assert!(count_ink(&bitmap) > 1000, "receipt should contain ink");
}

#[test]
fn render_is_deterministic_and_watermark_changes_output() {
    init_logging();
    let doc = sample_document();
    let fonts = fixture_fonts();
    let qr = Qr::new(&doc.qr_payload);
    let config = RenderConfig::new(304);

    let first = receipt::render(&doc, &fonts, &qr, &config).unwrap();
    let second = receipt::render(&doc, &fonts, &qr, &config).unwrap();
    assert_eq!(first, second);

    let mut production = sample_document();
    production.homologation = false;
    let third = receipt::render(&production, &fonts, &qr, &config).unwrap();
    assert_ne!(first, third, "homologation watermark must leave a trace");
}

#[test]
fn totals_and_payment_lines_use_brl_display_strings() {
    // The literal strings the 300px scenario must show.
    assert_eq!(receipt::moeda(31000), "R$ 310,00");
    assert_eq!(receipt::moeda(21000), "R$ 210,00");
    assert_eq!(receipt::moeda(10000), "R$ 100,00");
    assert_eq!(
        receipt::chave_formatada(&sample_document().access_key),
        "2521 1012 9311 5800 0164 5500 1000 0000 0711 8721 3591"
    );
}

#[test]
fn rendered_receipt_encodes_in_raster_mode() {
    init_logging();
    let doc = sample_document();
    let fonts = fixture_fonts();
    let qr = Qr::new(&doc.qr_payload);
    let config = RenderConfig::new(304);

    let bitmap = receipt::render(&doc, &fonts, &qr, &config).unwrap();
    let height = bitmap.height();

    let mut encoder = Encoder::new(ImageMode::Raster);
    let bytes = encoder
        .image(&bitmap)
        .unwrap()
        .newline()
        .cut(CutKind::Partial)
        .encode();

    let row_bytes: u32 = 304 / 8;
    assert_eq!(
        &bytes[..8],
        &[
            0x1D,
            0x76,
            0x30,
            0x00,
            (row_bytes & 0xFF) as u8,
            0,
            (height & 0xFF) as u8,
            ((height >> 8) & 0xFF) as u8,
        ]
    );
    assert_eq!(bytes.len(), 8 + (row_bytes * height) as usize + 2 + 3);

    // The encoder resets after encode and can serve another document.
    assert!(encoder.encode().is_empty());
}

#[test]
fn logo_pipeline_dithers_an_rgba_image() {
    init_logging();
    // Horizontal gradient via the `image` crate, converted at the crate
    // boundary and dithered to a logo bitmap.
    let gradient = image::RgbaImage::from_fn(64, 16, |x, _| {
        let v = (x * 4) as u8;
        image::Rgba([v, v, v, 0xFF])
    });
    let raw = RgbaImage::from_raw(64, 16, gradient.into_raw()).unwrap();
    let logo = Dither::FloydSteinberg.apply(&raw);
    assert_eq!((logo.width(), logo.height()), (64, 16));
    let ink = count_ink(&logo);
    assert!(ink > 0 && ink < 64 * 16, "gradient should dither to a mix");

    let doc = sample_document();
    let fonts = fixture_fonts();
    let qr = Qr::new(&doc.qr_payload);
    let plain = receipt::render(&doc, &fonts, &qr, &RenderConfig::new(304)).unwrap();
    let with_logo =
        receipt::render(&doc, &fonts, &qr, &RenderConfig::new(304).logo(logo)).unwrap();
    assert!(with_logo.height() > plain.height());
}
