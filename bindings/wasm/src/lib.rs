use std::time::Duration;

use serde::{Deserialize, Serialize};
use smilecheck::{
    CaptureConfig, CaptureEvent, CaptureSession, CaptureSlot, Clock, ConsentMethod,
    FaceDetectionResult, FlowType, ImageQualityAnalyzer, OutputFormat, PixelBuffer, Preset,
    QualityConfig, RoutingInput, ScanRecord, SessionTick, SmileCheckError,
};
use wasm_bindgen::prelude::*;

/// Options for a capture session, passed as a JavaScript object.
///
/// All fields are optional. When a `preset` is specified, its defaults apply
/// and individual fields override them.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionOptions {
    pub preset: Option<String>,
    pub quality: Option<QualityConfig>,
    pub circle_radius_pct: Option<f64>,
    pub countdown_total: Option<u32>,
    pub countdown_interval_ms: Option<u64>,
    pub sample_interval_ms: Option<u64>,
    pub slots: Option<Vec<CaptureSlot>>,
    pub capture_format: Option<String>,
    pub capture_quality: Option<f32>,
}

/// Flow and consent context as sent by the page. Enum fields stay strings
/// here so unknown values are rejected with a proper error code.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingOptions {
    pub flow_type: String,
    pub is_minor: bool,
    #[serde(default)]
    pub consent_method: Option<String>,
    #[serde(default)]
    pub has_school_consent_on_file: bool,
}

fn string_to_preset(preset: &str) -> Result<Preset, JsValue> {
    match preset {
        "standard" => Ok(Preset::Standard),
        "low-light" => Ok(Preset::LowLight),
        "strict" => Ok(Preset::Strict),
        _ => Err(make_error(
            "INVALID_OPTIONS",
            &format!("unknown preset: {preset}"),
        )),
    }
}

fn string_to_format(format: &str) -> Result<OutputFormat, JsValue> {
    match format {
        "jpeg" => Ok(OutputFormat::Jpeg),
        "png" => Ok(OutputFormat::Png),
        _ => Err(make_error(
            "INVALID_OPTIONS",
            &format!("unknown format: {format}"),
        )),
    }
}

/// Create a JS `Error` with a `code` property.
fn make_error(code: &str, message: &str) -> JsValue {
    let err = js_sys::Error::new(message);
    let _ = js_sys::Reflect::set(&err, &"code".into(), &JsValue::from_str(code));
    JsValue::from(err)
}

/// Convert a `SmileCheckError` into a JS `Error` with a machine-readable `code` property.
fn to_js_error(e: SmileCheckError) -> JsValue {
    let code = match &e {
        SmileCheckError::ZeroDimensions => "ZERO_DIMENSIONS",
        SmileCheckError::BufferSizeMismatch { .. } => "BUFFER_SIZE_MISMATCH",
        SmileCheckError::DecodeError(_) => "DECODE_ERROR",
        SmileCheckError::EncodeError(_) => "ENCODE_ERROR",
        SmileCheckError::InvalidQuality(_) => "INVALID_QUALITY",
        SmileCheckError::UnknownFlowType(_) => "UNKNOWN_FLOW_TYPE",
        SmileCheckError::UnknownConsentMethod(_) => "UNKNOWN_CONSENT_METHOD",
        SmileCheckError::InvalidConfig(_) => "INVALID_CONFIG",
    };
    make_error(code, &e.to_string())
}

fn parse_options<T: for<'de> Deserialize<'de> + Default>(options: JsValue) -> Result<T, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(T::default())
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid options: {e}")))
    }
}

/// Serialize to a plain JS value, keeping `null` fields and plain objects.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

/// Build a frame from canvas `ImageData` bytes. `None` means the video has
/// not produced a frame yet: no data, or a 0x0 frame before the first decode.
fn to_frame(width: u32, height: u32, data: Option<Vec<u8>>) -> Result<Option<PixelBuffer>, JsValue> {
    if width == 0 || height == 0 {
        return Ok(None);
    }
    data.map(|bytes| PixelBuffer::new(width, height, bytes).map_err(to_js_error))
        .transpose()
}

fn format_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Jpeg => "jpeg",
        OutputFormat::Png => "png",
    }
}

/// Apply parsed `SessionOptions` to a `CaptureConfig`.
fn apply_options(mut config: CaptureConfig, opts: &SessionOptions) -> Result<CaptureConfig, JsValue> {
    if let Some(ref p) = opts.preset {
        config = config.preset(string_to_preset(p)?);
    }
    if let Some(quality) = opts.quality {
        config = config.quality(quality);
    }
    if let Some(radius) = opts.circle_radius_pct {
        config = config.circle_radius(radius);
    }
    if let Some(total) = opts.countdown_total {
        config = config.countdown(total);
    }
    if let Some(ms) = opts.countdown_interval_ms {
        config = config.countdown_interval(Duration::from_millis(ms));
    }
    if let Some(ms) = opts.sample_interval_ms {
        config = config.sample_interval(Duration::from_millis(ms));
    }
    if let Some(ref slots) = opts.slots {
        config = config.slots(slots.clone());
    }
    Ok(config)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameVerdict {
    blur: bool,
    brightness: bool,
    exposure: bool,
    feedback: Vec<&'static str>,
    metrics: Option<smilecheck::QualityMetrics>,
}

/// Judge one frame against the quality thresholds.
///
/// @param width - Frame width in pixels
/// @param height - Frame height in pixels
/// @param data - RGBA bytes from `ImageData.data`, or `null` if no frame yet
/// @param options - Optional quality thresholds: minBlurScore, minBrightness,
///   maxBrightness, minContrast
#[wasm_bindgen(js_name = "analyzeFrame")]
pub fn analyze_frame(
    width: u32,
    height: u32,
    data: Option<Vec<u8>>,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    let config: QualityConfig = parse_options(options)?;
    let frame = to_frame(width, height, data)?;

    let analyzer = ImageQualityAnalyzer::new(config);
    let (checks, metrics) = match analyzer.analyze_with_metrics(frame.as_ref()) {
        Some((checks, metrics)) => (checks, Some(metrics)),
        None => (analyzer.analyze(None), None),
    };

    to_js(&FrameVerdict {
        blur: checks.blur,
        brightness: checks.brightness,
        exposure: checks.exposure,
        feedback: smilecheck::quality_feedback(&checks),
        metrics,
    })
}

/// Checks object as returned by `analyzeFrame` or a session tick.
#[derive(Deserialize)]
struct ChecksInput {
    blur: bool,
    brightness: bool,
    exposure: bool,
}

/// Remediation hints for a set of failed checks, in display order.
///
/// @param checks - Object with boolean fields blur, brightness, exposure
#[wasm_bindgen(js_name = "qualityFeedback")]
pub fn quality_feedback(checks: JsValue) -> Result<Vec<String>, JsValue> {
    let checks: ChecksInput = serde_wasm_bindgen::from_value(checks)
        .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid checks: {e}")))?;
    let checks = smilecheck::QualityChecks {
        blur: checks.blur,
        brightness: checks.brightness,
        exposure: checks.exposure,
    };
    Ok(smilecheck::quality_feedback(&checks)
        .into_iter()
        .map(str::to_string)
        .collect())
}

/// Milliseconds from `Date.now()`, relative to session start.
struct JsClock {
    origin_ms: f64,
}

impl JsClock {
    fn new() -> Self {
        Self {
            origin_ms: js_sys::Date::now(),
        }
    }
}

impl Clock for JsClock {
    fn now(&self) -> Duration {
        let elapsed_ms = (js_sys::Date::now() - self.origin_ms).max(0.0);
        Duration::from_secs_f64(elapsed_ms / 1000.0)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CaptureObject {
    slot_index: usize,
    slot_label: String,
    cycle: u64,
    /// "jpeg" or "png", or "rgba" when encoding failed and `data` is the raw frame.
    format: &'static str,
    width: u32,
    height: u32,
    #[serde(with = "as_uint8_array")]
    data: Vec<u8>,
    encode_error: Option<String>,
}

mod as_uint8_array {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TickObject {
    quality: smilecheck::QualityChecks,
    feedback: Vec<&'static str>,
    guardrail: smilecheck::GuardrailResult,
    ring_progress: f64,
    slot_index: usize,
    capture: Option<CaptureObject>,
    completed: bool,
}

/// A live capture session bound to one video element.
#[wasm_bindgen(js_name = "CaptureSession")]
pub struct WasmCaptureSession {
    inner: CaptureSession<JsClock>,
    format: OutputFormat,
    quality: f32,
}

#[wasm_bindgen(js_class = "CaptureSession")]
impl WasmCaptureSession {
    /// @param options - Optional object with fields: preset, quality,
    ///   circleRadiusPct, countdownTotal, countdownIntervalMs,
    ///   sampleIntervalMs, slots, captureFormat, captureQuality (0.0 to 1.0)
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<WasmCaptureSession, JsValue> {
        let opts: SessionOptions = parse_options(options)?;
        let config = apply_options(CaptureConfig::new(), &opts)?;
        let format = match opts.capture_format {
            Some(ref f) => string_to_format(f)?,
            None => OutputFormat::default(),
        };
        let quality = opts.capture_quality.unwrap_or(0.85);
        if !(0.0..=1.0).contains(&quality) {
            return Err(make_error(
                "INVALID_OPTIONS",
                &format!("captureQuality must be between 0.0 and 1.0, got {quality}"),
            ));
        }
        let inner = CaptureSession::with_clock(config, JsClock::new()).map_err(to_js_error)?;

        Ok(Self {
            inner,
            format,
            quality,
        })
    }

    /// Size of the element the video is displayed in.
    #[wasm_bindgen(js_name = "setContainer")]
    pub fn set_container(&mut self, width: f64, height: f64) {
        self.inner.set_container(smilecheck::Container::new(width, height));
    }

    /// Feed one sampled frame and the detector output for it.
    ///
    /// Returns `null` once the session is stopped or every slot is captured.
    pub fn sample(
        &mut self,
        width: u32,
        height: u32,
        data: Option<Vec<u8>>,
        face: JsValue,
    ) -> Result<JsValue, JsValue> {
        let frame = to_frame(width, height, data)?;
        let face: Option<FaceDetectionResult> = if face.is_undefined() || face.is_null() {
            None
        } else {
            Some(
                serde_wasm_bindgen::from_value(face)
                    .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid face result: {e}")))?,
            )
        };

        match self.inner.sample(frame.as_ref(), face.as_ref()) {
            Some(tick) => to_js(&self.tick_object(tick)),
            None => Ok(JsValue::NULL),
        }
    }

    /// Stop sampling; any countdown in progress is dropped without a capture.
    pub fn stop(&mut self) {
        self.inner.stop();
    }

    #[wasm_bindgen(js_name = "isStopped")]
    pub fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }

    #[wasm_bindgen(js_name = "isComplete")]
    pub fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }

    /// Suggested sampler interval in milliseconds.
    #[wasm_bindgen(js_name = "sampleIntervalMs")]
    pub fn sample_interval_ms(&self) -> u32 {
        u32::try_from(self.inner.config().sample_interval_ms).unwrap_or(u32::MAX)
    }

    fn tick_object(&self, tick: SessionTick) -> TickObject {
        let capture = tick
            .capture
            .as_ref()
            .map(|event| capture_object(event, self.format, self.quality));
        TickObject {
            quality: tick.quality,
            feedback: tick.feedback,
            guardrail: tick.guardrail,
            ring_progress: tick.ring_progress,
            slot_index: tick.slot_index,
            capture,
            completed: tick.completed,
        }
    }
}

/// The slot is already committed when a capture fires, so an encode
/// failure hands back the raw frame instead of dropping it.
fn capture_object(event: &CaptureEvent, format: OutputFormat, quality: f32) -> CaptureObject {
    let (format, width, height, data, encode_error) = match event.encode(format, quality) {
        Ok(encoded) => (
            format_name(encoded.format),
            encoded.width,
            encoded.height,
            encoded.data,
            None,
        ),
        Err(e) => (
            "rgba",
            event.frame.width(),
            event.frame.height(),
            event.frame.as_bytes().to_vec(),
            Some(e.to_string()),
        ),
    };
    CaptureObject {
        slot_index: event.slot_index,
        slot_label: event.slot_label.clone(),
        cycle: event.cycle,
        format,
        width,
        height,
        data,
        encode_error,
    }
}

/// Decide UI variant and report recipient for a flow/consent context.
///
/// @param input - Object with fields: flowType, isMinor, consentMethod
///   (optional, defaults to "parent"), hasSchoolConsentOnFile (optional)
#[wasm_bindgen(js_name = "decideRouting")]
pub fn decide_routing(input: JsValue) -> Result<JsValue, JsValue> {
    let opts: RoutingOptions = serde_wasm_bindgen::from_value(input)
        .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid routing input: {e}")))?;

    let flow_type: FlowType = opts.flow_type.parse().map_err(to_js_error)?;
    let consent_method = match opts.consent_method {
        Some(ref method) => method.parse::<ConsentMethod>().map_err(to_js_error)?,
        None => ConsentMethod::default(),
    };

    let decision = smilecheck::decide(&RoutingInput {
        flow_type,
        is_minor: opts.is_minor,
        consent_method,
        has_school_consent_on_file: opts.has_school_consent_on_file,
    });
    to_js(&decision)
}

/// Map an ML `overall_status` to "Healthy", "Needs Attention" or "Concern".
#[wasm_bindgen(js_name = "deriveSchoolStatus")]
pub fn derive_school_status(overall_status: &str) -> String {
    smilecheck::derive_school_simplified_status(overall_status)
        .label()
        .to_string()
}

/// Map an ML `overall_status` to "Low", "Medium" or "High".
#[wasm_bindgen(js_name = "deriveCharityPriority")]
pub fn derive_charity_priority(overall_status: &str) -> String {
    smilecheck::derive_charity_care_priority(overall_status)
        .label()
        .to_string()
}

/// Project a stored scan down to what the given audience may see.
///
/// @param scan - Object with fields: id, ageGroup (optional), rawResult
///   (stored ML JSON text, optional)
/// @param flow - "gym", "school" or "charity"; anything else withholds results
/// @param has_partner_access - Clinical partner credentials
#[wasm_bindgen(js_name = "filterScanResult")]
pub fn filter_scan_result(
    scan: JsValue,
    flow: &str,
    has_partner_access: bool,
) -> Result<JsValue, JsValue> {
    let scan: ScanRecord = serde_wasm_bindgen::from_value(scan)
        .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid scan record: {e}")))?;
    to_js(&smilecheck::filter_scan_result_for(
        &scan,
        flow,
        has_partner_access,
    ))
}
