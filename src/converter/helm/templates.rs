//! Helm template sources.
//!
//! Templates are Go-template text for a later `helm` render, so they are kept
//! as plain strings with placeholders instead of going through a Rust
//! template engine that would fight over `{{ }}`:
//!
//! - `__CHART__` sanitized chart name used in every `include`
//! - `__KEY__` values key of the service
//! - `__SERVICE__` Kubernetes name of the service
//! - `__NAMESPACE_FLAG__` ` --namespace <ns>` in NOTES.txt commands, or empty

const HELPERS: &str = r#"{{/*
Expand the name of the chart.
*/}}
{{- define "__CHART__.name" -}}
{{- default .Chart.Name .Values.nameOverride | trunc 63 | trimSuffix "-" }}
{{- end }}

{{/*
Create a default fully qualified app name.
*/}}
{{- define "__CHART__.fullname" -}}
{{- if .Values.fullnameOverride }}
{{- .Values.fullnameOverride | trunc 63 | trimSuffix "-" }}
{{- else }}
{{- $name := default .Chart.Name .Values.nameOverride }}
{{- if contains $name .Release.Name }}
{{- .Release.Name | trunc 63 | trimSuffix "-" }}
{{- else }}
{{- printf "%s-%s" .Release.Name $name | trunc 63 | trimSuffix "-" }}
{{- end }}
{{- end }}
{{- end }}

{{/*
Create chart name and version as used by the chart label.
*/}}
{{- define "__CHART__.chart" -}}
{{- printf "%s-%s" .Chart.Name .Chart.Version | replace "+" "_" | trunc 63 | trimSuffix "-" }}
{{- end }}

{{/*
Common labels
*/}}
{{- define "__CHART__.labels" -}}
helm.sh/chart: {{ include "__CHART__.chart" . }}
{{ include "__CHART__.selectorLabels" . }}
{{- if .Chart.AppVersion }}
app.kubernetes.io/version: {{ .Chart.AppVersion | quote }}
{{- end }}
app.kubernetes.io/managed-by: {{ .Release.Service }}
{{- end }}

{{/*
Selector labels
*/}}
{{- define "__CHART__.selectorLabels" -}}
app.kubernetes.io/name: {{ include "__CHART__.name" . }}
app.kubernetes.io/instance: {{ .Release.Name }}
{{- end }}
"#;

const NOTES_HEADER: &str = r#"Thank you for installing {{ .Chart.Name }}!

Your release is named {{ .Release.Name }}.

To learn more about the release, try:

  $ helm status {{ .Release.Name }}__NAMESPACE_FLAG__
  $ helm get all {{ .Release.Name }}__NAMESPACE_FLAG__

"#;

const NOTES_ACCESS: &str = r#"{{- if .Values.__KEY__.ingress.enabled }}
  Service __SERVICE__:
    {{- range .Values.__KEY__.ingress.hosts }}
    http{{ if $.Values.__KEY__.ingress.tls }}s{{ end }}://{{ .host }}
    {{- end }}
{{- else }}
  Service __SERVICE__:
    kubectl__NAMESPACE_FLAG__ port-forward service/{{ include "__CHART__.fullname" . }}-__SERVICE__ {{ .Values.__KEY__.service.port }}:{{ .Values.__KEY__.service.port }}
{{- end }}

"#;

const DEPLOYMENT: &str = r#"{{- if .Values.__KEY__.enabled }}
apiVersion: apps/v1
kind: Deployment
metadata:
  name: {{ include "__CHART__.fullname" . }}-__SERVICE__
  labels:
    {{- include "__CHART__.labels" . | nindent 4 }}
    app.kubernetes.io/component: __SERVICE__
spec:
  {{- if not .Values.__KEY__.autoscaling.enabled }}
  replicas: {{ .Values.__KEY__.replicaCount }}
  {{- end }}
  selector:
    matchLabels:
      {{- include "__CHART__.selectorLabels" . | nindent 6 }}
      app.kubernetes.io/component: __SERVICE__
  template:
    metadata:
      labels:
        {{- include "__CHART__.selectorLabels" . | nindent 8 }}
        app.kubernetes.io/component: __SERVICE__
    spec:
      containers:
      - name: __SERVICE__
        image: "{{ .Values.__KEY__.image.repository }}:{{ .Values.__KEY__.image.tag | default .Chart.AppVersion }}"
        imagePullPolicy: {{ .Values.__KEY__.image.pullPolicy }}
        ports:
        - name: http
          containerPort: {{ .Values.__KEY__.service.port }}
          protocol: TCP
        {{- if .Values.__KEY__.env }}
        env:
        {{- range $key, $value := .Values.__KEY__.env }}
        - name: {{ $key }}
          value: {{ $value | quote }}
        {{- end }}
        {{- end }}
        resources:
          {{- toYaml .Values.__KEY__.resources | nindent 10 }}
{{- end }}
"#;

const SERVICE: &str = r#"{{- if .Values.__KEY__.enabled }}
apiVersion: v1
kind: Service
metadata:
  name: {{ include "__CHART__.fullname" . }}-__SERVICE__
  labels:
    {{- include "__CHART__.labels" . | nindent 4 }}
    app.kubernetes.io/component: __SERVICE__
spec:
  type: {{ .Values.__KEY__.service.type }}
  ports:
  - port: {{ .Values.__KEY__.service.port }}
    targetPort: http
    protocol: TCP
    name: http
  selector:
    {{- include "__CHART__.selectorLabels" . | nindent 4 }}
    app.kubernetes.io/component: __SERVICE__
{{- end }}
"#;

const INGRESS: &str = r#"{{- if and .Values.__KEY__.enabled .Values.__KEY__.ingress.enabled }}
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: {{ include "__CHART__.fullname" . }}-__SERVICE__
  labels:
    {{- include "__CHART__.labels" . | nindent 4 }}
    app.kubernetes.io/component: __SERVICE__
  {{- with .Values.__KEY__.ingress.annotations }}
  annotations:
    {{- toYaml . | nindent 4 }}
  {{- end }}
spec:
  {{- if .Values.__KEY__.ingress.className }}
  ingressClassName: {{ .Values.__KEY__.ingress.className }}
  {{- end }}
  {{- if .Values.__KEY__.ingress.tls }}
  tls:
    {{- range .Values.__KEY__.ingress.tls }}
    - hosts:
        {{- range .hosts }}
        - {{ . | quote }}
        {{- end }}
      secretName: {{ .secretName }}
    {{- end }}
  {{- end }}
  rules:
    {{- range .Values.__KEY__.ingress.hosts }}
    - host: {{ .host | quote }}
      http:
        paths:
          {{- range .paths }}
          - path: {{ .path }}
            pathType: {{ .pathType }}
            backend:
              service:
                name: {{ include "__CHART__.fullname" $ }}-__SERVICE__
                port:
                  number: {{ $.Values.__KEY__.service.port }}
          {{- end }}
    {{- end }}
{{- end }}
"#;

/// Names substituted into a service template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub chart: &'a str,
    pub key: &'a str,
    pub service: &'a str,
}

impl TemplateContext<'_> {
    fn fill(&self, source: &str) -> String {
        source
            .replace("__CHART__", self.chart)
            .replace("__KEY__", self.key)
            .replace("__SERVICE__", self.service)
    }
}

pub fn helpers(chart: &str) -> String {
    HELPERS.replace("__CHART__", chart)
}

/// NOTES.txt listing each service and how to reach it. Commands carry
/// `--namespace` when the chart targets one.
pub fn notes(services: &[TemplateContext<'_>], namespace: Option<&str>) -> String {
    let mut notes = String::from(NOTES_HEADER);
    notes.push_str("Services deployed:\n");
    for ctx in services {
        notes.push_str(&format!("  - {}\n", ctx.service));
    }
    notes.push_str("\nTo access your services:\n\n");
    for ctx in services {
        notes.push_str(&ctx.fill(NOTES_ACCESS));
    }
    let flag = namespace
        .filter(|ns| !ns.is_empty())
        .map(|ns| format!(" --namespace {}", ns))
        .unwrap_or_default();
    notes.replace("__NAMESPACE_FLAG__", &flag)
}

pub fn deployment(ctx: &TemplateContext<'_>) -> String {
    ctx.fill(DEPLOYMENT)
}

pub fn service(ctx: &TemplateContext<'_>) -> String {
    ctx.fill(SERVICE)
}

pub fn ingress(ctx: &TemplateContext<'_>) -> String {
    ctx.fill(INGRESS)
}
